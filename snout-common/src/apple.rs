//! Apple continuity record types carried in manufacturer data (company 0x004C)

pub const APPLE_COMPANY_ID: u16 = 0x004c;
pub const MICROSOFT_COMPANY_ID: u16 = 0x0006;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "user", derive(serde::Serialize, serde::Deserialize))]
pub enum AppleRecordKind {
    #[cfg_attr(feature = "user", serde(rename = "iBeacon"))]
    IBeacon,
    AirDrop,
    AirPods,
    #[cfg_attr(feature = "user", serde(rename = "AirPlay Destination"))]
    AirPlayDestination,
    #[cfg_attr(feature = "user", serde(rename = "AirPlay Source"))]
    AirPlaySource,
    Handoff,
    #[cfg_attr(feature = "user", serde(rename = "Wi-Fi Settings"))]
    WifiSettings,
    #[cfg_attr(feature = "user", serde(rename = "Instant Hotspot"))]
    InstantHotspot,
    #[cfg_attr(feature = "user", serde(rename = "Wi-Fi Join Network"))]
    WifiJoinNetwork,
    Nearby,
}

impl AppleRecordKind {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x02 => AppleRecordKind::IBeacon,
            0x05 => AppleRecordKind::AirDrop,
            0x07 => AppleRecordKind::AirPods,
            0x09 => AppleRecordKind::AirPlayDestination,
            0x0a => AppleRecordKind::AirPlaySource,
            0x0c => AppleRecordKind::Handoff,
            0x0d => AppleRecordKind::WifiSettings,
            0x0e => AppleRecordKind::InstantHotspot,
            0x0f => AppleRecordKind::WifiJoinNetwork,
            0x10 => AppleRecordKind::Nearby,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            AppleRecordKind::IBeacon => "iBeacon",
            AppleRecordKind::AirDrop => "AirDrop",
            AppleRecordKind::AirPods => "AirPods",
            AppleRecordKind::AirPlayDestination => "AirPlay Destination",
            AppleRecordKind::AirPlaySource => "AirPlay Source",
            AppleRecordKind::Handoff => "Handoff",
            AppleRecordKind::WifiSettings => "Wi-Fi Settings",
            AppleRecordKind::InstantHotspot => "Instant Hotspot",
            AppleRecordKind::WifiJoinNetwork => "Wi-Fi Join Network",
            AppleRecordKind::Nearby => "Nearby",
        }
    }
}

/// Text for a Nearby action code; `"??"` for codes without a known meaning.
pub fn nearby_action_text(code: u8) -> &'static str {
    match code {
        1 => "iOS recently updated",
        3 => "Locked Screen",
        7 => "Transition Phase",
        10 => "Locked Screen, Inform Apple Watch",
        11 => "Active User",
        13 => "Unknown",
        14 => "Phone Call or Facetime",
        _ => "??",
    }
}
