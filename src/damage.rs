pub(crate) const BLUEPRINT_PREFIX: &str = "bp_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DamageSource {
    DogZombie,
    ZombieBear,
    Mutant,
    RunnerBrute,
    Runner,
    Brute,
    Bloater,
    Armoured,
    Zombie,
    Bandit,
    Wolf,
    Bear,
    Deer,
    Snake,
    Spider,
    Npc,
    Player,
    Other,
}

impl DamageSource {
    pub fn label(&self) -> &'static str {
        match self {
            DamageSource::DogZombie => "Dog Zombie",
            DamageSource::ZombieBear => "Zombie Bear",
            DamageSource::Mutant => "Mutant",
            DamageSource::RunnerBrute => "Runner Brute",
            DamageSource::Runner => "Runner",
            DamageSource::Brute => "Brute",
            DamageSource::Bloater => "Bloater",
            DamageSource::Armoured => "Armoured",
            DamageSource::Zombie => "Zombie",
            DamageSource::Bandit => "Bandit",
            DamageSource::Wolf => "Wolf",
            DamageSource::Bear => "Bear",
            DamageSource::Deer => "Deer",
            DamageSource::Snake => "Snake",
            DamageSource::Spider => "Spider",
            DamageSource::Npc => "NPC",
            DamageSource::Player => "Player",
            DamageSource::Other => "Other",
        }
    }
}

struct DamageRule {
    category: DamageSource,
    needles: &'static [&'static str],
}

// Order matters: compound creature names overlap their components, so
// "RunnerBrute" must be caught before "Runner" or "Brute", and "ZombieBear"
// before "Zombie" or "Bear".
const DAMAGE_RULES: &[DamageRule] = &[
    DamageRule {
        category: DamageSource::DogZombie,
        needles: &["dog"],
    },
    DamageRule {
        category: DamageSource::ZombieBear,
        needles: &["zombiebear", "bearzombie"],
    },
    DamageRule {
        category: DamageSource::Mutant,
        needles: &["mutant"],
    },
    DamageRule {
        category: DamageSource::RunnerBrute,
        needles: &["runnerbrute"],
    },
    DamageRule {
        category: DamageSource::Runner,
        needles: &["runner"],
    },
    DamageRule {
        category: DamageSource::Brute,
        needles: &["brute"],
    },
    DamageRule {
        category: DamageSource::Bloater,
        needles: &["bloater"],
    },
    DamageRule {
        category: DamageSource::Armoured,
        needles: &["armoured", "armored"],
    },
    DamageRule {
        category: DamageSource::Zombie,
        needles: &["zombie", "zed"],
    },
    DamageRule {
        category: DamageSource::Bandit,
        needles: &["bandit"],
    },
    DamageRule {
        category: DamageSource::Wolf,
        needles: &["wolf"],
    },
    DamageRule {
        category: DamageSource::Bear,
        needles: &["bear"],
    },
    DamageRule {
        category: DamageSource::Deer,
        needles: &["deer"],
    },
    DamageRule {
        category: DamageSource::Snake,
        needles: &["snake"],
    },
    DamageRule {
        category: DamageSource::Spider,
        needles: &["spider"],
    },
    DamageRule {
        category: DamageSource::Npc,
        needles: &["npc"],
    },
];

pub fn classify_damage_source(raw_source: &str) -> DamageSource {
    let lowered_source = raw_source.trim().to_lowercase();

    for rule in DAMAGE_RULES {
        if rule
            .needles
            .iter()
            .any(|needle| lowered_source.contains(needle))
        {
            return rule.category;
        }
    }

    if lowered_source.starts_with(BLUEPRINT_PREFIX) {
        return DamageSource::Other;
    }

    DamageSource::Player
}

#[cfg(test)]
mod tests {
    use super::{classify_damage_source, DamageSource};

    #[test]
    fn compound_names_win_over_their_components() {
        assert_eq!(
            classify_damage_source("BP_ZombieRunnerBrute_C"),
            DamageSource::RunnerBrute
        );
        assert_eq!(
            classify_damage_source("BP_ZombieBear_C"),
            DamageSource::ZombieBear
        );
    }

    #[test]
    fn special_kinds_win_over_the_generic_zombie() {
        assert_eq!(
            classify_damage_source("BP_ZombieRunner_C"),
            DamageSource::Runner
        );
        assert_eq!(
            classify_damage_source("BP_ZombieBrute_C"),
            DamageSource::Brute
        );
        assert_eq!(
            classify_damage_source("BP_ZombieBloater_C"),
            DamageSource::Bloater
        );
        assert_eq!(
            classify_damage_source("BP_ZombieArmoured_C"),
            DamageSource::Armoured
        );
        assert_eq!(classify_damage_source("BP_Zombie_C"), DamageSource::Zombie);
    }

    #[test]
    fn wildlife_is_matched_case_insensitively() {
        assert_eq!(classify_damage_source("bp_wolf_c"), DamageSource::Wolf);
        assert_eq!(classify_damage_source("BP_BEAR_C"), DamageSource::Bear);
        assert_eq!(classify_damage_source("BP_Snake_C"), DamageSource::Snake);
    }

    #[test]
    fn unknown_blueprint_tokens_fall_to_other() {
        assert_eq!(
            classify_damage_source("BP_Landmine_C"),
            DamageSource::Other
        );
    }

    #[test]
    fn plain_names_fall_to_player() {
        assert_eq!(classify_damage_source("Bob"), DamageSource::Player);
        assert_eq!(
            classify_damage_source("Some Survivor"),
            DamageSource::Player
        );
    }

    #[test]
    fn labels_are_stable_counter_keys() {
        assert_eq!(DamageSource::DogZombie.label(), "Dog Zombie");
        assert_eq!(DamageSource::Npc.label(), "NPC");
        assert_eq!(DamageSource::Other.label(), "Other");
    }
}
