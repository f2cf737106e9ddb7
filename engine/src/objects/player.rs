//! Players: server-vault characters (`.bic`), a creature plus the vault
//! identity that authorized the load.

use aurora_core::gff::GffStruct;

use super::creature::Creature;
use super::SerializationProfile;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Player {
    pub cdkey: String,
    pub name: String,
    pub creature: Creature,
}

impl Player {
    /// Deserializes a `.bic`, which shares the creature schema.
    pub fn from_gff(s: &GffStruct<'_>, cdkey: &str, name: &str) -> Option<Player> {
        let creature = Creature::from_gff(s, SerializationProfile::Any)?;
        Some(Player {
            cdkey: cdkey.to_string(),
            name: name.to_string(),
            creature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurora_core::gff::{Gff, GffBuilder, GffValue};
    use aurora_core::resref::Resref;

    #[test]
    fn bic_is_a_creature() {
        let mut b = GffBuilder::new("BIC");
        let root = b.root();
        b.add(root, "TemplateResRef", GffValue::Resref(Resref::from("testmonkpc")));
        b.add(root, "Dex", GffValue::Byte(13));

        let gff = Gff::from_bytes(&b.to_bytes());
        let player = Player::from_gff(&gff.toplevel(), "CDKEY", "testmonkpc").unwrap();
        assert_eq!(player.cdkey, "CDKEY");
        assert_eq!(player.creature.common.resref, "testmonkpc");
        assert_eq!(player.creature.stats.get_ability_score(1), 13);
    }
}
