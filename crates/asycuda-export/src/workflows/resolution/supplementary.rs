//! Free-text carrier, port and place lookups used for header overrides.

const TRANSPORT_BY_VESSEL: &[(&str, &str)] = &[
    ("AMERICAN", "AA"),
    ("DELTA", "DL"),
    ("BRITISH", "BA"),
    ("VIRGIN", "VS"),
    ("ROYAL CARIBBEAN", "VC"),
    ("CARIBBEAN", "BW"),
    ("JETBLUE", "B6"),
    ("UNITED", "UA"),
    ("AIR CANADA", "AC"),
    ("PRINCESS", "VC"),
    ("CARNIVAL", "VC"),
    ("CELEBRITY", "VC"),
    ("NORWEGIAN", "VC"),
];

const OFFICE_BY_PORT: &[(&str, &str)] = &[
    ("UVF", "LCHB"),
    ("HEWANORRA", "LCHB"),
    ("SLU", "LCVGC"),
    ("CASTRIES", "LCCAP"),
    ("VIEUX FORT", "LCVFP"),
];

const COUNTRY_BY_PLACE: &[(&str, &str)] = &[
    ("USA", "US"),
    ("UNITED STATES", "US"),
    ("CANADA", "CA"),
    ("UNITED KINGDOM", "GB"),
    ("UK", "GB"),
    ("ENGLAND", "GB"),
    ("FRANCE", "FR"),
    ("GERMANY", "DE"),
    ("ITALY", "IT"),
    ("SPAIN", "ES"),
    ("SAINT LUCIA", "LC"),
    ("ST LUCIA", "LC"),
    ("ST. LUCIA", "LC"),
];

pub fn transport_for_vessel(vessel: &str) -> Option<&'static str> {
    lookup(TRANSPORT_BY_VESSEL, vessel)
}

pub fn office_for_port(port: &str) -> Option<&'static str> {
    lookup(OFFICE_BY_PORT, port)
}

pub fn country_for_place(place: &str) -> Option<&'static str> {
    lookup(COUNTRY_BY_PLACE, place)
}

fn lookup(table: &'static [(&'static str, &'static str)], text: &str) -> Option<&'static str> {
    let text = text.trim().to_uppercase();
    if text.is_empty() {
        return None;
    }
    table
        .iter()
        .find(|(needle, _)| text.contains(needle))
        .map(|(_, code)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carriers_map_to_transport_codes() {
        assert_eq!(transport_for_vessel("Delta Flight 1845"), Some("DL"));
        assert_eq!(transport_for_vessel("Royal Caribbean - Oasis"), Some("VC"));
        assert_eq!(transport_for_vessel("Caribbean Airlines BW 431"), Some("BW"));
        assert_eq!(transport_for_vessel("private yacht"), None);
        assert_eq!(transport_for_vessel(""), None);
    }

    #[test]
    fn ports_and_places_map_to_codes() {
        assert_eq!(office_for_port("UVF"), Some("LCHB"));
        assert_eq!(office_for_port("Vieux Fort seaport"), Some("LCVFP"));
        assert_eq!(office_for_port("Rodney Bay"), None);
        assert_eq!(country_for_place("London, United Kingdom"), Some("GB"));
        assert_eq!(country_for_place("St. Lucia"), Some("LC"));
        assert_eq!(country_for_place("Toronto, Canada"), Some("CA"));
    }
}
