//! Storefront carrier names to PayPal carrier codes.
//!
//! Shopify reports the carrier as free text (`tracking_company`). PayPal wants one of its enumerated codes, or
//! `OTHER` together with the original name in `carrier_name_other`. [`carrier_code`] matches names exactly and
//! case-sensitively, since the names below are the ones Shopify itself emits. [`Carrier::from_name`] trims surrounding
//! whitespace first and is otherwise just as strict.

/// Carrier code PayPal uses for any carrier it does not list.
pub const OTHER_CARRIER: &str = "OTHER";

const CARRIER_CODES: [(&str, &str); 35] = [
    ("4PX", "FOUR_PX_EXPRESS"),
    ("APC", "APC_OVERNIGHT"),
    ("Australia Post", "AUSTRALIA_POST"),
    ("Bluedart", "BLUEDART"),
    ("Canada Post", "CANADA_POST"),
    ("China Post", "CHINA_POST"),
    ("Correios", "BRA_CORREIOS"),
    ("DHL Express", "DHL"),
    ("DHL eCommerce", "DHL_GLOBAL_MAIL"),
    ("DHL eCommerce Asia", "DHL_GLOBAL_MAIL_ASIA"),
    ("DPD", "DPD"),
    ("DPD Local", "DPD_LOCAL"),
    ("DPD UK", "DPD_UK"),
    ("Delhivery", "DELHIVERY_IN"),
    ("FedEx", "FEDEX"),
    ("GLS", "GLS"),
    ("Globegistics", "GLOBEGISTICS"),
    ("Japan Post (EN)", "JAPAN_POST"),
    ("Japan Post (JA)", "JAPAN_POST"),
    ("La Poste", "LAPOSTE"),
    ("New Zealand Post", "NZ_POST"),
    ("Newgistics", "APC"),
    ("PostNL", "POSTNL"),
    ("PostNord", "POSTNORD_LOGISTICS_GLOBAL"),
    ("Purolator", "PUROLATOR"),
    ("Royal Mail", "ROYAL_MAIL"),
    ("SF Express", "SF_EXPRESS"),
    ("Sagawa (EN)", "SAGAWA"),
    ("Sagawa (JA)", "SAGAWA_JP"),
    ("Singapore Post", "SINGPOST"),
    ("TNT", "TNT"),
    ("UPS", "UPS"),
    ("USPS", "USPS"),
    ("Yamato (EN)", "YAMATO"),
    ("Yamato (JA)", "JPN_YAMATO"),
];

/// The PayPal code for a storefront carrier name, if PayPal knows the carrier. The name must match exactly.
pub fn carrier_code(name: &str) -> Option<&'static str> {
    CARRIER_CODES.iter().find(|(n, _)| *n == name).map(|(_, code)| *code)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Carrier {
    Known(&'static str),
    /// Not in PayPal's list. Sent as `OTHER` with the original name attached.
    Other(String),
}

impl Carrier {
    /// Resolves a carrier name. Surrounding whitespace is trimmed before the exact lookup, and an unknown name is
    /// kept in its trimmed form. Missing or blank names become `Other("Other")` so that the provider always receives
    /// a non-empty `carrier_name_other`.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(n) => carrier_code(n).map(Carrier::Known).unwrap_or_else(|| Carrier::Other(n.to_string())),
            None => Carrier::Other("Other".to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Carrier::Known(code) => code,
            Carrier::Other(_) => OTHER_CARRIER,
        }
    }

    pub fn other_name(&self) -> Option<&str> {
        match self {
            Carrier::Known(_) => None,
            Carrier::Other(name) => Some(name.as_str()),
        }
    }
}
