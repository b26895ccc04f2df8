//! Static lookup tables. Order is significant: the first matching entry wins.

/// Keyword substring → classification code, scanned in order.
pub const CLASSIFICATION_KEYWORDS: &[(&str, &str)] = &[
    ("HAT", "65040000"),
    ("CAP", "65040000"),
    ("VISOR", "65040000"),
    ("SHIRT", "62053000"),
    ("POLO", "62053000"),
    ("PANT", "62034990"),
    ("SHORT", "62034990"),
    ("BERMUDA", "62034990"),
    ("SWIMSUIT", "62111200"),
    ("BIKINI", "62111200"),
    ("BATHING", "62111200"),
    ("COSMETIC BAG", "42023210"),
    ("BAG", "42022900"),
    ("CROSSBODY", "42022900"),
    ("CLUTCH", "42022900"),
    ("SANDAL", "64052000"),
    ("BRACELET", "71179000"),
    ("NECKLACE", "71179000"),
    ("EARRING", "71179000"),
    ("RING", "71179000"),
    ("SCRUNCHIE", "96159000"),
    ("SARONG", "62114300"),
    ("PAREO", "62114300"),
    ("DRESS", "62044900"),
    ("TUNIC", "62064000"),
    ("TOP", "62064000"),
    ("BOTTOM", "62089290"),
    ("RASHGUARD", "62111200"),
];

/// Broad category keywords used once every other strategy has failed.
pub const CATEGORY_FALLBACKS: &[(&[&str], &str)] = &[
    (&["SHIRT", "BLOUSE", "TOP", "TUNIC"], "62053000"),
    (&["PANT", "SHORT", "TROUSER"], "62034990"),
    (&["HAT", "CAP", "VISOR"], "65040000"),
    (&["BAG", "PURSE", "CLUTCH", "CROSSBODY"], "42022900"),
    (&["SANDAL", "SHOE", "FOOTWEAR"], "64052000"),
    (&["BRACELET", "NECKLACE", "EARRING", "RING", "JEWELRY"], "71179000"),
    (&["SWIMSUIT", "BIKINI", "SWIM"], "62111200"),
];

/// Generic imitation-jewellery heading.
pub const DEFAULT_CODE: &str = "71179000";

/// Words ignored by the token-overlap strategy.
pub const STOP_WORDS: &[&str] = &["AND", "WITH", "THE", "OF", "IN", "FOR", "TO", "A", "AN"];

/// Code prefix → (gross kg, net kg) per unit.
pub const WEIGHT_BY_PREFIX: &[(&str, f64, f64)] = &[
    ("6205", 0.3, 0.25),
    ("6206", 0.2, 0.15),
    ("6203", 0.5, 0.45),
    ("6204", 0.4, 0.35),
    ("6211", 0.3, 0.25),
    ("6208", 0.1, 0.08),
    ("6504", 0.2, 0.15),
    ("4202", 0.5, 0.45),
    ("6402", 0.6, 0.5),
    ("6405", 0.5, 0.4),
    ("7117", 0.05, 0.03),
];

/// Description keyword → (gross kg, net kg) per unit.
pub const WEIGHT_BY_KEYWORD: &[(&str, f64, f64)] = &[
    ("SHIRT", 0.3, 0.25),
    ("BLOUSE", 0.2, 0.15),
    ("PANT", 0.5, 0.45),
    ("SHORT", 0.3, 0.25),
    ("DRESS", 0.4, 0.35),
    ("SWIMSUIT", 0.3, 0.25),
    ("BIKINI", 0.2, 0.15),
    ("HAT", 0.2, 0.15),
    ("CAP", 0.2, 0.15),
    ("VISOR", 0.15, 0.1),
    ("BAG", 0.5, 0.45),
    ("CROSSBODY", 0.4, 0.35),
    ("CLUTCH", 0.3, 0.25),
    ("SANDAL", 0.5, 0.4),
    ("SHOE", 0.6, 0.5),
    ("BRACELET", 0.05, 0.03),
    ("NECKLACE", 0.05, 0.03),
    ("EARRING", 0.02, 0.01),
    ("RING", 0.02, 0.01),
    ("SCRUNCHIE", 0.05, 0.03),
    ("SARONG", 0.3, 0.25),
    ("PAREO", 0.3, 0.25),
    ("TUNIC", 0.3, 0.25),
    ("TOP", 0.2, 0.15),
    ("BOTTOM", 0.3, 0.25),
    ("RASHGUARD", 0.3, 0.25),
];

pub const DEFAULT_WEIGHT: (f64, f64) = (0.3, 0.25);

/// Two-digit chapter → customs office holding the originating import.
pub const OFFICE_BY_CHAPTER: &[(&str, &str)] = &[
    ("42", "LCCAP"),
    ("62", "LCVGC"),
    ("64", "LCVFP"),
    ("65", "LCCAP"),
    ("71", "LCCAP"),
];

pub const DEFAULT_OFFICE: &str = "LCCAP";

pub const FALLBACK_DOCUMENT_REFERENCE: &str = "LCCAP 2025 C 10000 art. 1";
