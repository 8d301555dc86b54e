use vxauth_apdu_transport_pcsc::PcscDeviceManager;

/// List all available readers
pub(crate) fn list_readers() -> eyre::Result<()> {
    let manager = PcscDeviceManager::new()?;
    let readers = manager.list_readers()?;

    if readers.is_empty() {
        println!("No readers found!");
        return Ok(());
    }

    println!("Available readers:");
    for (i, reader) in readers.iter().enumerate() {
        let status = if reader.has_card() {
            "card present"
        } else {
            "no card"
        };
        println!("{}. {} ({})", i + 1, reader.name(), status);
    }

    Ok(())
}
