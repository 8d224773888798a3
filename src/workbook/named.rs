//! Named ranges of the primary sheet
//!
//! External inputs arrive keyed by the workbook's range names; the English
//! aliases address the same cells.

use crate::cells::CellAddress;

use super::layout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedRange {
    pub name: &'static str,
    pub alias: Option<&'static str>,
    pub address: CellAddress,
}

pub const NAMED_RANGES: &[NamedRange] = &[
    NamedRange { name: "Xinput_datumvandaag", alias: Some("todayDate"), address: layout::TODAY },
    NamedRange { name: "Xinput_geboortedatumaanvrager1", alias: Some("birthdate1"), address: layout::BIRTHDATE_1 },
    NamedRange { name: "Xinput_partnerjanee", alias: Some("hasPartner"), address: layout::HAS_PARTNER },
    NamedRange { name: "Xinput_geboortedatumaanvrager2", alias: Some("birthdate2"), address: layout::BIRTHDATE_2 },
    NamedRange { name: "Xinput_marktwaarde", alias: Some("marketValue"), address: layout::MARKET_VALUE },
    NamedRange { name: "Xinput_wozwaarde", alias: Some("wozValue"), address: layout::WOZ_VALUE },
    NamedRange { name: "Xinput_hypotheekjanee", alias: Some("hasMortgage"), address: layout::HAS_MORTGAGE },
    NamedRange { name: "Xinput_hypotheeksaldo", alias: Some("mortgageBalance"), address: layout::MORTGAGE_BALANCE },
    NamedRange { name: "Xinput_aanbiederkeuze", alias: Some("providerChoice"), address: layout::PROVIDER_CHOICE },
    NamedRange { name: "rngTotal", alias: None, address: layout::RUNNING_TOTAL_AT_HORIZON },
];

/// Resolve a range name or alias (surrounding whitespace ignored)
pub fn resolve_name(name: &str) -> Option<CellAddress> {
    let name = name.trim();
    NAMED_RANGES
        .iter()
        .find(|r| r.name == name || r.alias == Some(name))
        .map(|r| r.address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_and_aliases() {
        assert_eq!(resolve_name("Xinput_wozwaarde"), Some(layout::WOZ_VALUE));
        assert_eq!(resolve_name(" wozValue "), Some(layout::WOZ_VALUE));
        assert_eq!(resolve_name("rngTotal"), Some(CellAddress::primary('M', 64)));
        assert_eq!(resolve_name("Xinput_unknown"), None);
    }

    #[test]
    fn test_every_range_is_unique() {
        for (i, a) in NAMED_RANGES.iter().enumerate() {
            for b in &NAMED_RANGES[i + 1..] {
                assert_ne!(a.address, b.address, "{} and {} share a cell", a.name, b.name);
            }
        }
    }
}
