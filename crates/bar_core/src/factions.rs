//! Faction definitions and native identifier translation.
//!
//! The simulator works with short, faction-neutral unit keys (`mex`,
//! `bot_lab`, ...). Each faction maps those keys onto the game's native
//! unit names, which is what a ground-truth replay needs to issue orders.

use serde::{Deserialize, Serialize};

/// Playable factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Faction {
    /// Armada.
    #[default]
    Armada,
    /// Cortex.
    Cortex,
}

/// Short key to native identifier table: `(key, armada, cortex)`.
const NATIVE_IDS: &[(&str, &str, &str)] = &[
    ("solar", "armsolar", "corsolar"),
    ("wind", "armwin", "corwin"),
    ("tidal", "armtide", "cortide"),
    ("geo_t1", "armgeo", "corgeo"),
    ("adv_solar", "armadvsol", "coradvsol"),
    ("fusion", "armfus", "corfus"),
    ("mex", "armmex", "cormex"),
    ("moho", "armmoho", "cormoho"),
    ("converter_t1", "armmakr", "cormakr"),
    ("converter_t2", "armmmkr", "cormmkr"),
    ("nano", "armnanotc", "cornanotc"),
    ("naval_nano", "armnanotcplat", "cornanotcplat"),
    ("radar", "armrad", "corrad"),
    ("energy_storage", "armestor", "corestor"),
    ("metal_storage", "armmstor", "cormstor"),
    ("bot_lab", "armlab", "corlab"),
    ("vehicle_plant", "armvp", "corvp"),
    ("aircraft_plant", "armap", "corap"),
    ("adv_bot_lab", "armalab", "coralab"),
    ("adv_vehicle_plant", "armavp", "coravp"),
    ("adv_aircraft_plant", "armaap", "coraap"),
    ("tick", "armflea", "corak"),
    ("pawn", "armpw", "corak"),
    ("grunt", "armham", "corthud"),
    ("rocketer", "armrock", "corstorm"),
    ("con_bot", "armck", "corck"),
    ("rez_bot", "armrectr", "cornecro"),
    ("adv_con_bot", "armack", "corack"),
    ("flash", "armflash", "corgator"),
    ("stumpy", "armstump", "corraid"),
    ("con_vehicle", "armcv", "corcv"),
    ("adv_con_vehicle", "armacv", "coracv"),
    ("llt", "armllt", "corllt"),
    ("hlt", "armhlt", "corhlt"),
    ("commander", "armcom", "corcom"),
];

impl Faction {
    /// All factions, in declaration order.
    pub const ALL: [Self; 2] = [Self::Armada, Self::Cortex];

    /// Get the display name for this faction.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Armada => "Armada",
            Self::Cortex => "Cortex",
        }
    }

    /// Get the lowercase key used in files and on the command line.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Armada => "armada",
            Self::Cortex => "cortex",
        }
    }

    /// Parse a faction key, case-insensitively.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.key().eq_ignore_ascii_case(key))
    }

    /// Translate a short unit key into this faction's native identifier.
    #[must_use]
    pub fn native_id(&self, key: &str) -> Option<&'static str> {
        NATIVE_IDS
            .iter()
            .find(|(short, _, _)| *short == key)
            .map(|(_, arm, cor)| match self {
                Self::Armada => *arm,
                Self::Cortex => *cor,
            })
    }

    /// Translate a native identifier back into the short unit key.
    ///
    /// Several short keys can share one native id (Cortex has no separate
    /// flea); the first entry in table order wins.
    #[must_use]
    pub fn short_key(&self, native: &str) -> Option<&'static str> {
        NATIVE_IDS
            .iter()
            .find(|(_, arm, cor)| match self {
                Self::Armada => *arm == native,
                Self::Cortex => *cor == native,
            })
            .map(|(short, _, _)| *short)
    }
}

impl std::fmt::Display for Faction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_id_translation() {
        assert_eq!(Faction::Armada.native_id("mex"), Some("armmex"));
        assert_eq!(Faction::Cortex.native_id("mex"), Some("cormex"));
        assert_eq!(Faction::Armada.native_id("not_a_unit"), None);
    }

    #[test]
    fn test_short_key_roundtrip() {
        for faction in Faction::ALL {
            let native = faction.native_id("bot_lab").unwrap();
            assert_eq!(faction.short_key(native), Some("bot_lab"));
        }
        // corak is shared by tick and pawn
        assert_eq!(Faction::Cortex.short_key("corak"), Some("tick"));
    }

    #[test]
    fn test_from_key() {
        assert_eq!(Faction::from_key("CORTEX"), Some(Faction::Cortex));
        assert_eq!(Faction::from_key("legion"), None);
    }
}
