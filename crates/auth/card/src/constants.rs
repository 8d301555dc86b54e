//! Card application constants

/// AID of the card application holding VxAuth identity data
pub const VX_APPLET_AID: &[u8] = &[
    0xA0, 0x00, 0x00, 0x03, 0x08, 0x00, 0x00, 0x10, 0x00, 0x01, 0x00,
];

/// Instruction bytes
pub mod ins {
    /// SELECT
    pub const SELECT: u8 = 0xA4;
    /// VERIFY
    pub const VERIFY: u8 = 0x20;
    /// RESET RETRY COUNTER
    pub const RESET_RETRY_COUNTER: u8 = 0x2C;
    /// GET DATA
    pub const GET_DATA: u8 = 0xCB;
    /// PUT DATA
    pub const PUT_DATA: u8 = 0xDB;
}

/// TLV tags
pub mod tags {
    /// Tag list naming a data object in GET DATA / PUT DATA
    pub const DATA_OBJECT_ID: u8 = 0x5C;
    /// Wrapper around a data object's content
    pub const DATA_OBJECT: u8 = 0x53;
    /// User role (UTF-8)
    pub const USER_ROLE: u8 = 0x80;
    /// User id (UTF-8)
    pub const USER_ID: u8 = 0x81;
    /// Election hash (hex string)
    pub const ELECTION_HASH: u8 = 0x82;
    /// Whether a poll worker card has a PIN (one byte, 0 or 1)
    pub const HAS_PIN: u8 = 0x83;
}

/// Data object holding the card identity
pub const IDENTITY_OBJECT_ID: [u8; 3] = [0x5F, 0xFF, 0x00];

/// Data object holding the election definition on election manager cards
pub const ELECTION_OBJECT_ID: [u8; 3] = [0x5F, 0xFF, 0x01];

/// P2 reference of the card PIN
pub const PIN_REFERENCE: u8 = 0x80;

/// Wrong PIN attempts before the card blocks
pub const CARD_PIN_RETRY_LIMIT: u8 = 15;

/// Number of digits in a PIN
pub const PIN_LENGTH: usize = 6;

/// PIN field length on the wire, padded with `0xFF`
pub const PIN_FIELD_LENGTH: usize = 8;

/// PIN left on an unprogrammed card
pub const DEFAULT_PIN: &str = "000000";

/// Unblocking key used to set the PIN while programming
pub const RESET_REFERENCE: [u8; PIN_FIELD_LENGTH] = *b"87654321";
