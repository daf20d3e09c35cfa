//! Bluetooth SIG company identifiers
//!
//! Sorted by identifier so lookups can binary search. Covers the first
//! block of assignments plus vendors commonly seen in advertising traffic.

pub const UNKNOWN_COMPANY: &str = "??";

const COMPANY_IDS: &[(u16, &str)] = &[
    (0x0000, "Ericsson Technology Licensing"),
    (0x0001, "Nokia Mobile Phones"),
    (0x0002, "Intel Corp."),
    (0x0003, "IBM Corp."),
    (0x0004, "Toshiba Corp."),
    (0x0005, "3Com"),
    (0x0006, "Microsoft"),
    (0x0007, "Lucent"),
    (0x0008, "Motorola"),
    (0x0009, "Infineon Technologies AG"),
    (0x000a, "Qualcomm Technologies International, Ltd. (QTIL)"),
    (0x000b, "Silicon Wave"),
    (0x000c, "Digianswer A/S"),
    (0x000d, "Texas Instruments Inc."),
    (0x000e, "Parthus Technologies Inc."),
    (0x000f, "Broadcom Corporation"),
    (0x0010, "Mitel Semiconductor"),
    (0x0011, "Widcomm, Inc."),
    (0x0012, "Zeevo, Inc."),
    (0x0013, "Atmel Corporation"),
    (0x0014, "Mitsubishi Electric Corporation"),
    (0x0015, "RTX Telecom A/S"),
    (0x0016, "KC Technology Inc."),
    (0x0017, "Newlogic"),
    (0x0018, "Transilica, Inc."),
    (0x0019, "Rohde & Schwarz GmbH & Co. KG"),
    (0x001a, "TTPCom Limited"),
    (0x001b, "Signia Technologies, Inc."),
    (0x001c, "Conexant Systems Inc."),
    (0x001d, "Qualcomm"),
    (0x001e, "Inventel"),
    (0x001f, "AVM Berlin"),
    (0x0020, "BandSpeed, Inc."),
    (0x0021, "Mansella Ltd"),
    (0x0022, "NEC Corporation"),
    (0x0023, "WavePlus Technology Co., Ltd."),
    (0x0024, "Alcatel"),
    (0x0025, "NXP Semiconductors"),
    (0x0026, "C Technologies"),
    (0x0027, "Open Interface"),
    (0x0028, "R F Micro Devices"),
    (0x0029, "Hitachi Ltd"),
    (0x002a, "Symbol Technologies, Inc."),
    (0x002b, "Tenovis"),
    (0x002c, "Macronix International Co. Ltd."),
    (0x002d, "GCT Semiconductor"),
    (0x002e, "Norwood Systems"),
    (0x002f, "MewTel Technology Inc."),
    (0x0030, "ST Microelectronics"),
    (0x0031, "Synopsys, Inc."),
    (0x0032, "Red-M (Communications) Ltd"),
    (0x0033, "Commil Ltd"),
    (0x0034, "Computer Access Technology Corporation (CATC)"),
    (0x0035, "Eclipse (HQ Espana) S.L."),
    (0x0036, "Renesas Electronics Corporation"),
    (0x0037, "Mobilian Corporation"),
    (0x0038, "Syntronix Corporation"),
    (0x0039, "Integrated System Solution Corp."),
    (0x003a, "Panasonic Corporation"),
    (0x003b, "Gennum Corporation"),
    (0x003c, "BlackBerry Limited"),
    (0x003d, "IPextreme, Inc."),
    (0x003e, "Systems and Chips, Inc"),
    (0x003f, "Bluetooth SIG, Inc"),
    (0x0040, "Seiko Epson Corporation"),
    (0x0041, "Integrated Silicon Solution Taiwan, Inc."),
    (0x0042, "CONWISE Technology Corporation Ltd"),
    (0x0043, "PARROT AUTOMOTIVE SAS"),
    (0x0044, "Socket Mobile"),
    (0x0045, "Atheros Communications, Inc."),
    (0x0046, "MediaTek, Inc."),
    (0x0047, "Bluegiga"),
    (0x0048, "Marvell Technology Group Ltd."),
    (0x0049, "3DSP Corporation"),
    (0x004a, "Accel Semiconductor Ltd."),
    (0x004b, "Continental Automotive Systems"),
    (0x004c, "Apple, Inc."),
    (0x004d, "Staccato Communications, Inc."),
    (0x004e, "Avago Technologies"),
    (0x004f, "APT Ltd."),
    (0x0050, "SiRF Technology, Inc."),
    (0x0051, "Tzero Technologies, Inc."),
    (0x0052, "J&M Corporation"),
    (0x0053, "Free2move AB"),
    (0x0054, "3DiJoy Corporation"),
    (0x0055, "Plantronics, Inc."),
    (0x0056, "Sony Ericsson Mobile Communications"),
    (0x0057, "Harman International Industries, Inc."),
    (0x0058, "Vizio, Inc."),
    (0x0059, "Nordic Semiconductor ASA"),
    (0x005a, "EM Microelectronic-Marin SA"),
    (0x005b, "Ralink Technology Corporation"),
    (0x005c, "Belkin International, Inc."),
    (0x005d, "Realtek Semiconductor Corporation"),
    (0x005e, "Stonestreet One, LLC"),
    (0x005f, "Wicentric, Inc."),
    (0x0060, "RivieraWaves S.A.S"),
    (0x0061, "RDA Microelectronics"),
    (0x0062, "Gibson Guitars"),
    (0x0063, "MiCommand Inc."),
    (0x0064, "Band XI International, LLC"),
    (0x0065, "Hewlett-Packard Company"),
    (0x0066, "9Solutions Oy"),
    (0x0067, "GN Netcom A/S"),
    (0x0068, "General Motors"),
    (0x0069, "A&D Engineering, Inc."),
    (0x006a, "MindTree Ltd."),
    (0x006b, "Polar Electro OY"),
    (0x006c, "Beautiful Enterprise Co., Ltd."),
    (0x006d, "BriarTek, Inc"),
    (0x006e, "Summit Data Communications, Inc."),
    (0x006f, "Sound ID"),
    (0x0070, "Monster, LLC"),
    (0x0071, "connectBlue AB"),
    (0x0072, "ShangHai Super Smart Electronics Co. Ltd."),
    (0x0073, "Group Sense Ltd."),
    (0x0074, "Zomm, LLC"),
    (0x0075, "Samsung Electronics Co. Ltd."),
    (0x0076, "Creative Technology Ltd."),
    (0x0077, "Laird Technologies"),
    (0x0078, "Nike, Inc."),
    (0x0079, "lesswire AG"),
    (0x007a, "MStar Semiconductor, Inc."),
    (0x007b, "Hanlynn Technologies"),
    (0x007c, "A & R Cambridge"),
    (0x007d, "Seers Technology Co., Ltd."),
    (0x007e, "Sports Tracking Technologies Ltd."),
    (0x007f, "Autonet Mobile"),
    (0x0080, "DeLorme Publishing Company, Inc."),
    (0x0081, "WuXi Vimicro"),
    (0x0082, "Sennheiser Communications A/S"),
    (0x0083, "TimeKeeping Systems, Inc."),
    (0x0084, "Ludus Helsinki Ltd."),
    (0x0085, "BlueRadios, Inc."),
    (0x0086, "Equinux AG"),
    (0x0087, "Garmin International, Inc."),
    (0x0088, "Ecotest"),
    (0x0089, "GN ReSound A/S"),
    (0x008a, "Jawbone"),
    (0x008b, "Topcon Positioning Systems, LLC"),
    (0x008c, "Gimbal Inc."),
    (0x008d, "Zscan Software"),
    (0x008e, "Quintic Corp"),
    (0x008f, "Telit Wireless Solutions GmbH"),
    (0x0090, "Funai Electric Co., Ltd."),
    (0x0091, "Advanced PANMOBIL systems GmbH & Co. KG"),
    (0x0092, "ThinkOptics, Inc."),
    (0x0093, "Universal Electronics, Inc."),
    (0x0094, "Airoha Technology Corp."),
    (0x0095, "NEC Lighting, Ltd."),
    (0x0096, "ODM Technology, Inc."),
    (0x0097, "ConnecteDevice Ltd."),
    (0x0098, "zero1.tv GmbH"),
    (0x0099, "i.Tech Dynamic Global Distribution Ltd."),
    (0x009a, "Alpwise"),
    (0x009b, "Jiangsu Toppower Automotive Electronics Co., Ltd."),
    (0x009c, "Colorfy, Inc."),
    (0x009d, "Geoforce Inc."),
    (0x009e, "Bose Corporation"),
    (0x009f, "Suunto Oy"),
    (0x00a0, "Kensington Computer Products Group"),
    (0x00a1, "SR-Medizinelektronik"),
    (0x00a2, "Vertu Corporation Limited"),
    (0x00a3, "Meta Watch Ltd."),
    (0x00a4, "LINAK A/S"),
    (0x00a5, "OTL Dynamics LLC"),
    (0x00a6, "Panda Ocean Inc."),
    (0x00a7, "Visteon Corporation"),
    (0x00a8, "ARP Devices Limited"),
    (0x00a9, "Magneti Marelli S.p.A"),
    (0x00aa, "CAEN RFID srl"),
    (0x00ab, "Ingenieur-Systemgruppe Zahn GmbH"),
    (0x00ac, "Green Throttle Games"),
    (0x00ad, "Peter Systemtechnik GmbH"),
    (0x00ae, "Omegawave Oy"),
    (0x00af, "Cinetix"),
    (0x00b0, "Passif Semiconductor Corp"),
    (0x00b1, "Saris Cycling Group, Inc"),
    (0x00b2, "Bekey A/S"),
    (0x00b3, "Clarinox Technologies Pty. Ltd."),
    (0x00b4, "BDE Technology Co., Ltd."),
    (0x00b5, "Swirl Networks"),
    (0x00b6, "Meso international"),
    (0x00b7, "TreLab Ltd"),
    (0x00b8, "Qualcomm Innovation Center, Inc. (QuIC)"),
    (0x00b9, "Johnson Controls, Inc."),
    (0x00ba, "Starkey Laboratories Inc."),
    (0x00bb, "S-Power Electronics Limited"),
    (0x00bc, "Ace Sensor Inc"),
    (0x00bd, "Aplix Corporation"),
    (0x00be, "AAMP of America"),
    (0x00bf, "Stalmart Technology Limited"),
    (0x00c0, "AMICCOM Electronics Corporation"),
    (0x00c1, "Shenzhen Excelsecu Data Technology Co.,Ltd"),
    (0x00c2, "Geneq Inc."),
    (0x00c3, "adidas AG"),
    (0x00c4, "LG Electronics"),
    (0x00c5, "Onset Computer Corporation"),
    (0x00c6, "Selfly BV"),
    (0x00c7, "Quuppa Oy."),
    (0x00c8, "GeLo Inc"),
    (0x00c9, "Evluma"),
    (0x00ca, "MC10"),
    (0x00cb, "Binauric SE"),
    (0x00cc, "Beats Electronics"),
    (0x00cd, "Microchip Technology Inc."),
    (0x00ce, "Elgato Systems GmbH"),
    (0x00cf, "ARCHOS SA"),
    (0x00d0, "Dexcom, Inc."),
    (0x00d1, "Polar Electro Europe B.V."),
    (0x00d2, "Dialog Semiconductor B.V."),
    (0x00d3, "Taixingbang Technology (HK) Co,. LTD."),
    (0x00d4, "Kawantech"),
    (0x00d5, "Austco Communication Systems"),
    (0x00d6, "Timex Group USA, Inc."),
    (0x00d7, "Qualcomm Technologies, Inc."),
    (0x00d8, "Qualcomm Connected Experiences, Inc."),
    (0x00d9, "Voyetra Turtle Beach"),
    (0x00da, "txtr GmbH"),
    (0x00db, "Biosentronics"),
    (0x00dc, "Procter & Gamble"),
    (0x00dd, "Hosiden Corporation"),
    (0x00de, "Muzik LLC"),
    (0x00df, "Misfit Wearables Corp"),
    (0x00e0, "Google"),
    (0x00e1, "Danlers Ltd"),
    (0x00e2, "Semilink Inc"),
    (0x00e3, "inMusic Brands, Inc"),
    (0x00e4, "L.S. Research Inc."),
    (0x00e5, "Eden Software Consultants Ltd."),
    (0x00e6, "Freshtemp"),
    (0x00e7, "KS Technologies"),
    (0x00e8, "ACTS Technologies"),
    (0x00e9, "Vtrack Systems"),
    (0x00ea, "Nielsen-Kellerman Company"),
    (0x00eb, "Server Technology, Inc."),
    (0x00ec, "BioResearch Associates"),
    (0x00ed, "Jolly Logic, LLC"),
    (0x00ee, "Above Average Outcomes, Inc."),
    (0x00ef, "Bitsplitters GmbH"),
    (0x00f0, "PayPal, Inc."),
    (0x00f1, "Witron Technology Limited"),
    (0x00f2, "Morse Project Inc."),
    (0x00f3, "Kent Displays Inc."),
    (0x00f4, "Nautilus Inc."),
    (0x00f5, "Smartifier Oy"),
    (0x00f6, "Elcometer Limited"),
    (0x00f7, "VSN Technologies, Inc."),
    (0x00f8, "AceUni Corp., Ltd."),
    (0x00f9, "StickNFind"),
    (0x00fa, "Crystal Code AB"),
    (0x00fb, "KOUKAAM a.s."),
    (0x00fc, "Delphi Corporation"),
    (0x00fd, "ValenceTech Limited"),
    (0x00fe, "Stanley Black and Decker"),
    (0x00ff, "Typo Products, LLC"),
    (0x0118, "Radius Networks, Inc."),
    (0x012d, "Sony Corporation"),
    (0x0131, "Cypress Semiconductor"),
    (0x0157, "Anhui Huami Information Technology Co., Ltd."),
    (0x0171, "Amazon.com Services, LLC"),
    (0x01da, "Logitech International SA"),
    (0x02e5, "Espressif Incorporated"),
    (0x02ff, "Silicon Laboratories"),
    (0x038f, "Xiaomi Inc."),
    (0x0499, "Ruuvi Innovations Ltd."),
    (0x05a7, "Sonos Inc"),
];

pub fn company_name(id: u16) -> Option<&'static str> {
    COMPANY_IDS
        .binary_search_by_key(&id, |(c, _)| *c)
        .ok()
        .map(|idx| COMPANY_IDS[idx].1)
}

/// Like [`company_name`] but falls back to [`UNKNOWN_COMPANY`].
pub fn company_name_or_unknown(id: u16) -> &'static str {
    company_name(id).unwrap_or(UNKNOWN_COMPANY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_keep_table_sorted() {
        assert!(COMPANY_IDS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn should_resolve_common_vendors() {
        assert_eq!(company_name(0x004c), Some("Apple, Inc."));
        assert_eq!(company_name(0x0006), Some("Microsoft"));
        assert_eq!(company_name(0x0059), Some("Nordic Semiconductor ASA"));
    }

    #[test]
    fn should_mark_unassigned_identifiers() {
        assert_eq!(company_name(0xfffe), None);
        assert_eq!(company_name_or_unknown(0xfffe), "??");
    }
}
