//! Condition matching.
//!
//! Pure functions deciding whether a game event satisfies a criterion and,
//! if so, how the event folds into stored progress. No side effects beyond
//! one-shot gap logging: criterion kinds and condition kinds with no
//! implementation fail closed (treated as non-matching) and are logged once
//! per kind so gaps surface without destabilizing evaluation.

use std::collections::HashSet;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use tracing::warn;

use crate::types::{
    Condition, CriteriaType, Criterion, EventKind, FailCondition, GameEvent, MoneySink,
    ProgressMode, TimedType, TimedWindow,
};

/// How a matched event changes the criterion counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressDelta {
    /// Value to fold in.
    pub amount: u64,
    /// Fold mode.
    pub mode: ProgressMode,
}

impl ProgressDelta {
    fn accumulate(amount: u64) -> Option<Self> {
        Some(Self {
            amount,
            mode: ProgressMode::Accumulate,
        })
    }

    fn set(amount: u64) -> Option<Self> {
        Some(Self {
            amount,
            mode: ProgressMode::Set,
        })
    }

    fn highest(amount: u64) -> Option<Self> {
        Some(Self {
            amount,
            mode: ProgressMode::Highest,
        })
    }
}

static UNHANDLED_TYPES: Lazy<Mutex<HashSet<CriteriaType>>> =
    Lazy::new(|| Mutex::new(HashSet::new()));
static UNKNOWN_CONDITIONS: Lazy<Mutex<HashSet<u32>>> = Lazy::new(|| Mutex::new(HashSet::new()));

fn log_unhandled_type(ty: CriteriaType) {
    let mut seen = UNHANDLED_TYPES.lock().unwrap();
    if seen.insert(ty) {
        warn!(criteria_type = %ty, "criterion kind has no matcher implementation; treating as non-match");
    }
}

fn log_unknown_condition(id: u32) {
    let mut seen = UNKNOWN_CONDITIONS.lock().unwrap();
    if seen.insert(id) {
        warn!(condition = id, "unknown condition kind; failing closed");
    }
}

/// Asset value of zero means "any".
fn asset_matches(asset: u64, value: u32) -> bool {
    asset == 0 || asset == value as u64
}

/// Decide whether `event` advances `criterion` and by how much.
///
/// Deterministic for a given pair; returns `None` when the event does not
/// match the criterion's kind, asset, or additional conditions.
pub fn evaluate(criterion: &Criterion, event: &GameEvent) -> Option<ProgressDelta> {
    let delta = kind_delta(criterion, event)?;
    if !conditions_hold(&criterion.conditions, event) {
        return None;
    }
    Some(delta)
}

/// Match the criterion kind and primary asset against the event, producing
/// the progress delta. Additional conditions are checked separately.
fn kind_delta(criterion: &Criterion, event: &GameEvent) -> Option<ProgressDelta> {
    use CriteriaType as Ct;
    use EventKind as Ev;

    let asset = criterion.asset;
    match criterion.ty {
        Ct::KillCreature => match event.kind {
            Ev::KillCreature { entry } if asset_matches(asset, entry) => {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::KillCreatureType | Ct::KillCreatureTypeGuild => match event.kind {
            Ev::KillCreatureType { creature_type } if asset_matches(asset, creature_type) => {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::KilledByCreature => match event.kind {
            Ev::KilledByCreature { entry } if asset_matches(asset, entry) => {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::KilledByPlayer => match event.kind {
            Ev::KilledByPlayer => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::Death => match event.kind {
            Ev::Death => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::DeathAtMap => match event.kind {
            Ev::Death if event.world.map.is_some_and(|m| asset_matches(asset, m)) => {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::WinBattleground => match event.kind {
            Ev::WinBattleground { map } if asset_matches(asset, map) => {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::CompleteBattleground => match event.kind {
            Ev::CompleteBattleground { map } if asset_matches(asset, map) => {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::WinRatedBattleground => match event.kind {
            Ev::WinRatedBattleground => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::WinArena | Ct::WinRatedArena => match event.kind {
            Ev::WinArena { map } if asset_matches(asset, map) => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::PlayArena => match event.kind {
            Ev::PlayArena { map } if asset_matches(asset, map) => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::WinDuel => match event.kind {
            Ev::WinDuel => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::LoseDuel => match event.kind {
            Ev::LoseDuel => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::HonorableKill | Ct::EarnHonorableKill | Ct::HonorableKillsGuild => match event.kind {
            Ev::HonorableKill => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::HonorableKillAtArea => match event.kind {
            Ev::HonorableKill
                if event.source.area.is_some_and(|a| asset_matches(asset, a)) =>
            {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::HkClass => match event.kind {
            Ev::HonorableKill
                if event
                    .target
                    .as_ref()
                    .and_then(|t| t.class)
                    .is_some_and(|c| asset_matches(asset, c)) =>
            {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::HkRace => match event.kind {
            Ev::HonorableKill
                if event
                    .target
                    .as_ref()
                    .and_then(|t| t.race)
                    .is_some_and(|r| asset_matches(asset, r)) =>
            {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::ReachLevel => match event.kind {
            Ev::ReachLevel { level } => ProgressDelta::set(level as u64),
            _ => None,
        },
        Ct::ReachGuildLevel => match event.kind {
            Ev::ReachGuildLevel { level } => ProgressDelta::set(level as u64),
            _ => None,
        },
        Ct::ReachSkillLevel | Ct::LearnSkillLevel => match event.kind {
            Ev::ReachSkillLevel { skill, level } if asset_matches(asset, skill) => {
                ProgressDelta::set(level as u64)
            }
            _ => None,
        },
        Ct::LearnSpell => match event.kind {
            Ev::LearnSpell { spell } if asset_matches(asset, spell) => ProgressDelta::set(1),
            _ => None,
        },
        Ct::LearnSkillLine | Ct::LearnSkillLineSpells => match event.kind {
            Ev::LearnSkillLine { skill_line, spells } if asset_matches(asset, skill_line) => {
                ProgressDelta::set(spells as u64)
            }
            _ => None,
        },
        Ct::CastSpell => match event.kind {
            Ev::CastSpell { spell } if asset_matches(asset, spell) => {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::BeSpellTarget => match event.kind {
            Ev::BeSpellTarget { spell } if asset_matches(asset, spell) => {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::CompleteQuest => match event.kind {
            Ev::CompleteQuest { quest, .. } if asset_matches(asset, quest) => {
                ProgressDelta::set(1)
            }
            _ => None,
        },
        Ct::CompleteQuestCount | Ct::CompleteQuestsGuild => match event.kind {
            Ev::CompleteQuest { .. } => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::CompleteDailyQuest => match event.kind {
            Ev::CompleteQuest { daily: true, .. } => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::CompleteQuestsInZone => match event.kind {
            Ev::CompleteQuest { zone, .. } if asset_matches(asset, zone) => {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::QuestAbandoned => match event.kind {
            Ev::AbandonQuest { .. } => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::CompleteWorldQuest => match event.kind {
            Ev::CompleteQuest { quest, .. } if asset_matches(asset, quest) => {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::CompleteAchievement => match event.kind {
            Ev::CompleteAchievement { achievement, .. } if asset_matches(asset, achievement) => {
                ProgressDelta::set(1)
            }
            _ => None,
        },
        Ct::EarnAchievementPoints | Ct::EarnGuildAchievementPoints => match event.kind {
            Ev::CompleteAchievement { points, .. } => ProgressDelta::accumulate(points as u64),
            _ => None,
        },
        Ct::CurrencyGained => match event.kind {
            Ev::CurrencyGained { currency, total } if asset_matches(asset, currency) => {
                ProgressDelta::set(total)
            }
            _ => None,
        },
        Ct::GainReputation => match event.kind {
            Ev::GainReputation { faction, standing } if asset_matches(asset, faction) => {
                ProgressDelta::set(standing.max(0) as u64)
            }
            _ => None,
        },
        Ct::GainExaltedReputation => reputation_count(event, 42_000),
        Ct::GainReveredReputation => reputation_count(event, 21_000),
        Ct::GainHonoredReputation => reputation_count(event, 9_000),
        Ct::KnownFactions => match event.kind {
            Ev::GainReputation { .. } => {
                let profile = event.profile.as_ref()?;
                ProgressDelta::set(profile.reputation.len() as u64)
            }
            _ => None,
        },
        Ct::ExploreArea => match event.kind {
            Ev::ExploreArea { area } if asset_matches(asset, area) => ProgressDelta::set(1),
            _ => None,
        },
        Ct::EnterArea => match event.kind {
            Ev::EnterArea { area } if asset_matches(asset, area) => ProgressDelta::set(1),
            _ => None,
        },
        Ct::LeaveArea => match event.kind {
            Ev::LeaveArea { area } if asset_matches(asset, area) => ProgressDelta::set(1),
            _ => None,
        },
        Ct::OwnItem => match event.kind {
            Ev::OwnItem { item, count } if asset_matches(asset, item) => {
                ProgressDelta::set(count)
            }
            _ => None,
        },
        Ct::UseItem => match event.kind {
            Ev::UseItem { item } if asset_matches(asset, item) => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::LootItem => match event.kind {
            Ev::LootItem { item, count, .. } if asset_matches(asset, item) => {
                ProgressDelta::accumulate(count)
            }
            _ => None,
        },
        Ct::LootType => match event.kind {
            Ev::LootItem {
                count, loot_type, ..
            } if asset_matches(asset, loot_type) => ProgressDelta::accumulate(count),
            _ => None,
        },
        Ct::EquipItem => match event.kind {
            Ev::EquipItem { item, .. } if asset_matches(asset, item) => ProgressDelta::set(1),
            _ => None,
        },
        Ct::EquipEpicItem => match event.kind {
            Ev::EquipItem { quality, .. } if quality >= 4 => ProgressDelta::set(1),
            _ => None,
        },
        Ct::LootMoney => match event.kind {
            Ev::LootMoney { amount } => ProgressDelta::accumulate(amount),
            _ => None,
        },
        Ct::GoldSpentForTalents => money_sink(event, MoneySink::Talents),
        Ct::GoldSpentForTravelling => money_sink(event, MoneySink::Travel),
        Ct::GoldSpentAtBarber => money_sink(event, MoneySink::Barber),
        Ct::GoldSpentForMail => money_sink(event, MoneySink::Mail),
        Ct::SpentGoldGuildRepairs => money_sink(event, MoneySink::GuildRepairs),
        Ct::UseGameObject => match event.kind {
            Ev::UseGameObject { entry } if asset_matches(asset, entry) => {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::FishInGameObject => match event.kind {
            Ev::FishInGameObject { entry } if asset_matches(asset, entry) => {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::CatchFromPool => match event.kind {
            Ev::CatchFromPool => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::DamageDone => match event.kind {
            Ev::DamageDone { amount } => ProgressDelta::accumulate(amount),
            _ => None,
        },
        Ct::TotalDamageReceived => match event.kind {
            Ev::DamageReceived { amount } => ProgressDelta::accumulate(amount),
            _ => None,
        },
        Ct::HealingDone => match event.kind {
            Ev::HealingDone { amount } => ProgressDelta::accumulate(amount),
            _ => None,
        },
        Ct::TotalHealingReceived => match event.kind {
            Ev::HealingReceived { amount } => ProgressDelta::accumulate(amount),
            _ => None,
        },
        Ct::HighestHitDealt => match event.kind {
            Ev::HighestHitDealt { amount } => ProgressDelta::highest(amount),
            _ => None,
        },
        Ct::HighestHitReceived => match event.kind {
            Ev::HighestHitReceived { amount } => ProgressDelta::highest(amount),
            _ => None,
        },
        Ct::HighestHealCast => match event.kind {
            Ev::HealingDone { amount } => ProgressDelta::highest(amount),
            _ => None,
        },
        Ct::HighestHealingReceived => match event.kind {
            Ev::HealingReceived { amount } => ProgressDelta::highest(amount),
            _ => None,
        },
        Ct::HighestPersonalRating => match event.kind {
            Ev::HighestPersonalRating { bracket, rating } if asset_matches(asset, bracket) => {
                ProgressDelta::highest(rating as u64)
            }
            _ => None,
        },
        Ct::HighestTeamRating => match event.kind {
            Ev::HighestTeamRating { bracket, rating } if asset_matches(asset, bracket) => {
                ProgressDelta::highest(rating as u64)
            }
            _ => None,
        },
        Ct::FallWithoutDying => match event.kind {
            Ev::FallWithoutDying { distance } => ProgressDelta::highest(distance as u64),
            _ => None,
        },
        Ct::DoEmote => match event.kind {
            Ev::DoEmote { emote } if asset_matches(asset, emote) => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::BuyBankSlot => match event.kind {
            Ev::BuyBankSlot => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::VisitBarberShop => match event.kind {
            Ev::VisitBarberShop => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::RollNeed | Ct::RollNeedOnLoot => match event.kind {
            Ev::RollNeed { item } if asset_matches(asset, item) => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::RollGreed | Ct::RollGreedOnLoot => match event.kind {
            Ev::RollGreed { item } if asset_matches(asset, item) => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::ReleaseSpirit => match event.kind {
            Ev::ReleaseSpirit => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::CompleteDungeonEncounter => match event.kind {
            Ev::CompleteDungeonEncounter { encounter } if asset_matches(asset, encounter) => {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::CompleteLfgDungeon => match event.kind {
            Ev::CompleteLfgDungeon { dungeon } if asset_matches(asset, dungeon) => {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::CompleteChallengeMode => match event.kind {
            Ev::CompleteChallengeMode { map, .. } if asset_matches(asset, map) => {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::CompleteScenario => match event.kind {
            Ev::CompleteScenario { scenario } if asset_matches(asset, scenario) => {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::CompleteScenarioCount => match event.kind {
            Ev::CompleteScenario { .. } => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::SendEvent => match event.kind {
            Ev::ScriptedEvent { event: id } if asset_matches(asset, id) => {
                ProgressDelta::accumulate(1)
            }
            _ => None,
        },
        Ct::OnLogin => match event.kind {
            Ev::Login => ProgressDelta::accumulate(1),
            _ => None,
        },
        Ct::ManualCompleteCriteria => match event.kind {
            Ev::ManualComplete { criterion: id } if id == criterion.id.0 => ProgressDelta::set(1),
            _ => None,
        },
        // Everything else is a recognized kind with no implementation yet:
        // fail closed, log once.
        other => {
            log_unhandled_type(other);
            None
        }
    }
}

fn reputation_count(event: &GameEvent, threshold: i32) -> Option<ProgressDelta> {
    match event.kind {
        EventKind::GainReputation { .. } => {
            let profile = event.profile.as_ref()?;
            let count = profile
                .reputation
                .values()
                .filter(|&&standing| standing >= threshold)
                .count() as u64;
            ProgressDelta::set(count)
        }
        _ => None,
    }
}

fn money_sink(event: &GameEvent, expected: MoneySink) -> Option<ProgressDelta> {
    match event.kind {
        EventKind::MoneySpent { sink, amount } if sink == expected => {
            ProgressDelta::accumulate(amount)
        }
        _ => None,
    }
}

/// Evaluate an additional-condition list. All conditions must hold.
pub fn conditions_hold(conditions: &[Condition], event: &GameEvent) -> bool {
    conditions.iter().all(|c| condition_holds(c, event))
}

/// Evaluate one condition against the event context. Missing context data
/// fails the condition closed.
fn condition_holds(condition: &Condition, event: &GameEvent) -> bool {
    let source = &event.source;
    let target = event.target.as_ref();
    let profile = event.profile.as_ref();

    match condition {
        Condition::TargetCreatureEntry { entry } => {
            target.and_then(|t| t.creature_entry) == Some(*entry)
        }
        Condition::TargetMustBePlayer => target.is_some_and(|t| t.is_player),
        Condition::TargetMustBeDead => target.and_then(|t| t.alive) == Some(false),
        Condition::TargetMustBeEnemy => target.and_then(|t| t.hostile) == Some(true),
        Condition::SourceIsAlive => source.alive == Some(true),
        Condition::SourceHasAura { spell } => source.has_aura(*spell),
        Condition::SourceHasAuraType { aura_type } => source.has_aura_type(*aura_type),
        Condition::TargetHasAura { spell } => target.is_some_and(|t| t.has_aura(*spell)),
        Condition::TargetHasAuraType { aura_type } => {
            target.is_some_and(|t| t.has_aura_type(*aura_type))
        }
        Condition::ItemLevelMin { level } => match event.kind {
            EventKind::EquipItem { item_level, .. } => item_level >= *level,
            _ => false,
        },
        Condition::ItemQualityMin { quality } => match event.kind {
            EventKind::EquipItem { quality: q, .. } => q >= *quality,
            _ => false,
        },
        Condition::ItemQualityEquals { quality } => match event.kind {
            EventKind::EquipItem { quality: q, .. } => q == *quality,
            _ => false,
        },
        Condition::SourceAreaOrZone { area } => {
            source.area == Some(*area) || source.zone == Some(*area)
        }
        Condition::TargetAreaOrZone { area } => {
            target.is_some_and(|t| t.area == Some(*area) || t.zone == Some(*area))
        }
        Condition::SourceMap { map } => event.world.map == Some(*map),
        Condition::MapDifficulty { difficulty } => event.world.difficulty == Some(*difficulty),
        Condition::SourceRace { race } => source.race == Some(*race),
        Condition::SourceClass { class } => source.class == Some(*class),
        Condition::TargetRace { race } => target.and_then(|t| t.race) == Some(*race),
        Condition::TargetClass { class } => target.and_then(|t| t.class) == Some(*class),
        Condition::SourceLevel { cmp, level } => {
            source.level.is_some_and(|l| cmp.matches(l as u64, *level as u64))
        }
        Condition::TargetLevel { cmp, level } => target
            .and_then(|t| t.level)
            .is_some_and(|l| cmp.matches(l as u64, *level as u64)),
        Condition::SourceHealthPct { cmp, pct } => source
            .health_pct
            .is_some_and(|p| cmp.matches(p as u64, *pct as u64)),
        Condition::TargetHealthPct { cmp, pct } => target
            .and_then(|t| t.health_pct)
            .is_some_and(|p| cmp.matches(p as u64, *pct as u64)),
        Condition::TargetHealth { cmp, health } => target
            .and_then(|t| t.health)
            .is_some_and(|h| cmp.matches(h, *health)),
        Condition::MaxGroupMembers { count } => {
            event.world.group_size.is_some_and(|s| s <= *count)
        }
        Condition::InGroup => event.world.group_size.is_some_and(|s| s > 1),
        Condition::NotInGroup => event.world.group_size.map_or(true, |s| s <= 1),
        Condition::TargetCreatureType { creature_type } => {
            target.and_then(|t| t.creature_type) == Some(*creature_type)
        }
        Condition::TargetCreatureFamily { family } => {
            target.and_then(|t| t.creature_family) == Some(*family)
        }
        Condition::SourceDrunkValue { min } => source.drunk_value.is_some_and(|d| d >= *min),
        Condition::ReputationStanding { faction, min } => profile
            .and_then(|p| p.reputation.get(faction))
            .is_some_and(|&standing| standing >= *min),
        Condition::IsOnQuest { quest } => profile.is_some_and(|p| p.quests_on.contains(quest)),
        Condition::CompletedQuest { quest } => {
            profile.is_some_and(|p| p.quests_completed.contains(quest))
        }
        Condition::RewardedQuest { quest } => {
            profile.is_some_and(|p| p.quests_rewarded.contains(quest))
        }
        Condition::HasAchievement { achievement } => {
            profile.is_some_and(|p| p.achievements.contains(achievement))
        }
        Condition::HasSpell { spell } => profile.is_some_and(|p| p.spells.contains(spell)),
        Condition::ItemCount { item, count } => profile
            .and_then(|p| p.items.get(item))
            .is_some_and(|&held| held >= *count),
        Condition::SkillLevel { skill, min } => profile
            .and_then(|p| p.skills.get(skill))
            .is_some_and(|&value| value >= *min),
        Condition::HonorLevel { min } => profile.is_some_and(|p| p.honor_level >= *min),
        Condition::Unknown { id } => {
            log_unknown_condition(*id);
            false
        }
    }
}

/// The timed-window kind an event can open, if any. Used to narrow the
/// start-event lookup before checking assets with [`start_matches`].
pub fn timed_type_for(kind: &EventKind) -> Option<TimedType> {
    match kind {
        EventKind::ScriptedEvent { .. } => Some(TimedType::Event),
        EventKind::AcceptQuest { .. } => Some(TimedType::AcceptQuest),
        EventKind::CastSpell { .. } => Some(TimedType::CastSpell),
        EventKind::BeSpellTarget { .. } => Some(TimedType::BeSpellTarget),
        EventKind::KillCreature { .. } => Some(TimedType::KillCreature),
        EventKind::UseItem { .. } => Some(TimedType::UseItem),
        EventKind::ScenarioStage { .. } => Some(TimedType::ScenarioStage),
        _ => None,
    }
}

/// Whether `event` opens the timed window described by `timed`.
pub fn start_matches(timed: &TimedWindow, event: &GameEvent) -> bool {
    let asset = timed.start_asset;
    match (timed.timed_type, &event.kind) {
        (TimedType::Event, EventKind::ScriptedEvent { event: id }) => asset == *id as u64,
        (TimedType::AcceptQuest, EventKind::AcceptQuest { quest }) => asset == *quest as u64,
        (TimedType::CastSpell, EventKind::CastSpell { spell }) => asset == *spell as u64,
        (TimedType::BeSpellTarget, EventKind::BeSpellTarget { spell }) => asset == *spell as u64,
        (TimedType::KillCreature, EventKind::KillCreature { entry }) => asset == *entry as u64,
        (TimedType::UseItem, EventKind::UseItem { item }) => asset == *item as u64,
        (TimedType::ScenarioStage, EventKind::ScenarioStage { stage, .. }) => {
            asset == *stage as u64
        }
        _ => false,
    }
}

/// Whether `event` triggers the given fail condition.
pub fn fail_matches(fail: &FailCondition, event: &GameEvent) -> bool {
    match (fail, &event.kind) {
        (FailCondition::NoDeath, EventKind::Death) => true,
        (FailCondition::NoLose, EventKind::LoseBattleground { .. }) => true,
        (FailCondition::NoSpellHit { spell }, EventKind::BeSpellTarget { spell: hit }) => {
            spell == hit
        }
        (FailCondition::RemoveAura { spell }, EventKind::AuraRemoved { spell: removed }) => {
            spell == removed
        }
        (FailCondition::CastSpell { spell }, EventKind::CastSpell { spell: cast }) => {
            spell == cast
        }
        (FailCondition::LeaveGroup, EventKind::GroupLeft) => true,
        (FailCondition::OnEvent { event: id }, EventKind::ScriptedEvent { event: fired }) => {
            id == fired
        }
        _ => false,
    }
}
