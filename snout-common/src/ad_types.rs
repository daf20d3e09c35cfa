//! Generic Access Profile advertising data types

/// AD types that the payload parser decodes structurally. Every other code
/// is carried as [`AdType::Other`] and kept as raw hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdType {
    Flags,
    IncompleteServiceUuids128,
    ShortenedLocalName,
    CompleteLocalName,
    SecurityManagerOobFlags,
    ServiceData16,
    ManufacturerSpecific,
    Other(u8),
}

impl AdType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => AdType::Flags,
            0x06 => AdType::IncompleteServiceUuids128,
            0x08 => AdType::ShortenedLocalName,
            0x09 => AdType::CompleteLocalName,
            0x11 => AdType::SecurityManagerOobFlags,
            0x16 => AdType::ServiceData16,
            0xff => AdType::ManufacturerSpecific,
            other => AdType::Other(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            AdType::Flags => 0x01,
            AdType::IncompleteServiceUuids128 => 0x06,
            AdType::ShortenedLocalName => 0x08,
            AdType::CompleteLocalName => 0x09,
            AdType::SecurityManagerOobFlags => 0x11,
            AdType::ServiceData16 => 0x16,
            AdType::ManufacturerSpecific => 0xff,
            AdType::Other(code) => *code,
        }
    }

    pub fn name(&self) -> Option<&'static str> {
        ad_type_name(self.code())
    }
}

const AD_TYPE_NAMES: &[(u8, &str)] = &[
    (0x01, "Flags"),
    (0x02, "Incomplete List of 16-bit Service Class UUIDs"),
    (0x03, "Complete List of 16-bit Service Class UUIDs"),
    (0x04, "Incomplete List of 32-bit Service Class UUIDs"),
    (0x05, "Complete List of 32-bit Service Class UUIDs"),
    (0x06, "Incomplete List of 128-bit Service Class UUIDs"),
    (0x07, "Complete List of 128-bit Service Class UUIDs"),
    (0x08, "Shortened Local Name"),
    (0x09, "Complete Local Name"),
    (0x0a, "Tx Power Level"),
    (0x0d, "Class of Device"),
    (0x0e, "Simple Pairing Hash C-192"),
    (0x0f, "Simple Pairing Randomizer R-192"),
    (0x10, "Security Manager TK Value"),
    (0x11, "Security Manager Out of Band Flags"),
    (0x12, "Slave Connection Interval Range"),
    (0x14, "List of 16-bit Service Solicitation UUIDs"),
    (0x15, "List of 128-bit Service Solicitation UUIDs"),
    (0x16, "Service Data - 16-bit UUID"),
    (0x17, "Public Target Address"),
    (0x18, "Random Target Address"),
    (0x19, "Appearance"),
    (0x1a, "Advertising Interval"),
    (0x1b, "LE Bluetooth Device Address"),
    (0x1c, "LE Role"),
    (0x1d, "Simple Pairing Hash C-256"),
    (0x1e, "Simple Pairing Randomizer R-256"),
    (0x1f, "List of 32-bit Service Solicitation UUIDs"),
    (0x20, "Service Data - 32-bit UUID"),
    (0x21, "Service Data - 128-bit UUID"),
    (0x22, "LE Secure Connections Confirmation Value"),
    (0x23, "LE Secure Connections Random Value"),
    (0x24, "URI"),
    (0x25, "Indoor Positioning"),
    (0x26, "Transport Discovery Data"),
    (0x27, "LE Supported Features"),
    (0x28, "Channel Map Update Indication"),
    (0x29, "PB-ADV"),
    (0x2a, "Mesh Message"),
    (0x2b, "Mesh Beacon"),
    (0x3d, "3D Information Data"),
    (0xff, "Manufacturer Specific Data"),
];

/// Assigned name of an AD type code, if the code is allocated.
pub fn ad_type_name(code: u8) -> Option<&'static str> {
    AD_TYPE_NAMES
        .binary_search_by_key(&code, |(c, _)| *c)
        .ok()
        .map(|idx| AD_TYPE_NAMES[idx].1)
}

pub const FLAG_LE_LIMITED: &str = "LE Limited Discoverable Mode";
pub const FLAG_LE_GENERAL: &str = "LE General Discoverable Mode";
pub const FLAG_BR_EDR_UNSUPPORTED: &str =
    "BR/EDR Not Supported (i.e. bit 37 of LMP Extended Feature bits Page 0)";
pub const FLAG_SIMULTANEOUS_CONTROLLER: &str = "Simultaneous LE and BR/EDR to Same Device Capable (Controller) (i.e. bit 49 of LMP Extended Feature bits Page 0)";
pub const FLAG_SIMULTANEOUS_HOST: &str = "Simultaneous LE and BR/EDR to Same Device Capable (Host) (i.e. bit 66 of LMP Extended Feature bits Page 1)";

/// Flags (0x01) bit positions, least significant first.
pub const ADVERTISING_FLAGS: [&str; 5] = [
    FLAG_LE_LIMITED,
    FLAG_LE_GENERAL,
    FLAG_BR_EDR_UNSUPPORTED,
    FLAG_SIMULTANEOUS_CONTROLLER,
    FLAG_SIMULTANEOUS_HOST,
];

pub const OOB_DATA_PRESENT: &str = "OOB data present";
pub const OOB_DATA_ABSENT: &str = "OOB data not present";
pub const OOB_LE_SUPPORTED: &str = "LE supported (Host) (i.e. bit 65 of LMP Extended Feature bits Page 1";
pub const OOB_SIMULTANEOUS_HOST: &str = "Simultaneous LE and BR/EDR to Same Device Capable (Host) (i.e. bit 66 of LMP Extended Fea- ture bits Page 1";
pub const OOB_RANDOM_ADDRESS: &str = "Address Type: Random Address";
pub const OOB_PUBLIC_ADDRESS: &str = "Address Type: Public Address";
