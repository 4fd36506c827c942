//! Built-in flag catalogue.
//!
//! Every flag defaults to the [`RegionGroup::NonMembers`] group unless noted.
//! `build` is the only flag that falls back to region membership when no
//! region has an opinion.

use super::{Flag, FlagKind, RegionGroup, StateValue};
use once_cell::sync::Lazy;

macro_rules! state_flags {
    ($($ident:ident => $name:literal),* $(,)?) => {
        $(pub static $ident: Lazy<Flag> = Lazy::new(|| Flag::state($name));)*
    };
}

/// State flags that are ALLOW unless some region says otherwise.
macro_rules! allowed_state_flags {
    ($($ident:ident => $name:literal),* $(,)?) => {
        $(pub static $ident: Lazy<Flag> = Lazy::new(|| Flag::state($name).with_default(StateValue::Allow));)*
    };
}

const GAME_MODES: &[&str] = &["survival", "creative", "adventure", "spectator"];
const WEATHER_TYPES: &[&str] = &["clear", "rain", "thunder"];

/// Regions with `passthrough` set to ALLOW do not count for membership checks.
pub static PASSTHROUGH: Lazy<Flag> = Lazy::new(|| Flag::state("passthrough"));

pub static BUILD: Lazy<Flag> = Lazy::new(|| {
    Flag::state("build")
        .with_default(StateValue::Allow)
        .with_membership_default()
});

state_flags! {
    INTERACT => "interact",
    BLOCK_BREAK => "block-break",
    BLOCK_PLACE => "block-place",
    USE => "use",
    DAMAGE_ANIMALS => "damage-animals",
    PVP => "pvp",
    TNT => "tnt",
    LIGHTER => "lighter",
    CHEST_ACCESS => "chest-access",
    SLEEP => "sleep",
    RESPAWN_ANCHORS => "respawn-anchors",
    VEHICLE_PLACE => "vehicle-place",
    VEHICLE_DESTROY => "vehicle-destroy",
    INVINCIBILITY => "invincible",
}

allowed_state_flags! {
    MOB_DAMAGE => "mob-damage",
    MOB_SPAWNING => "mob-spawning",
    CREEPER_EXPLOSION => "creeper-explosion",
    FIRE_SPREAD => "fire-spread",
    LAVA_FIRE => "lava-fire",
    LIGHTNING => "lightning",
    ITEM_PICKUP => "item-pickup",
    ITEM_DROP => "item-drop",
    FALL_DAMAGE => "fall-damage",
}

pub static ENTRY: Lazy<Flag> = Lazy::new(|| {
    Flag::state("entry")
        .with_default(StateValue::Allow)
        .with_default_group(RegionGroup::NonMembers)
});

pub static EXIT: Lazy<Flag> = Lazy::new(|| {
    Flag::state("exit")
        .with_default(StateValue::Allow)
        .with_default_group(RegionGroup::NonMembers)
});

pub static GREETING: Lazy<Flag> = Lazy::new(|| Flag::new("greeting", FlagKind::String));
pub static FAREWELL: Lazy<Flag> = Lazy::new(|| Flag::new("farewell", FlagKind::String));
pub static DENY_MESSAGE: Lazy<Flag> = Lazy::new(|| {
    Flag::new("deny-message", FlagKind::String).with_default("Hey! Sorry, but you can't %what% here.")
});
pub static ENTRY_DENY_MESSAGE: Lazy<Flag> = Lazy::new(|| {
    Flag::new("entry-deny-message", FlagKind::String).with_default("Hey! You are not permitted to enter this area.")
});
pub static EXIT_DENY_MESSAGE: Lazy<Flag> = Lazy::new(|| {
    Flag::new("exit-deny-message", FlagKind::String).with_default("Hey! You are not permitted to leave this area.")
});

pub static NOTIFY_ENTER: Lazy<Flag> = Lazy::new(|| Flag::new("notify-enter", FlagKind::Boolean));
pub static NOTIFY_LEAVE: Lazy<Flag> = Lazy::new(|| Flag::new("notify-leave", FlagKind::Boolean));

pub static HEAL_DELAY: Lazy<Flag> = Lazy::new(|| Flag::new("heal-delay", FlagKind::Integer));
pub static HEAL_AMOUNT: Lazy<Flag> = Lazy::new(|| Flag::new("heal-amount", FlagKind::Integer));
pub static MIN_HEAL: Lazy<Flag> = Lazy::new(|| Flag::new("heal-min-health", FlagKind::Double));
pub static MAX_HEAL: Lazy<Flag> = Lazy::new(|| Flag::new("heal-max-health", FlagKind::Double));

pub static PRICE: Lazy<Flag> = Lazy::new(|| Flag::new("price", FlagKind::Double));
pub static BUYABLE: Lazy<Flag> = Lazy::new(|| Flag::new("buyable", FlagKind::Boolean));

pub static DENY_SPAWN: Lazy<Flag> =
    Lazy::new(|| Flag::new("deny-spawn", FlagKind::Set(Box::new(FlagKind::String))));
pub static BLOCKED_CMDS: Lazy<Flag> =
    Lazy::new(|| Flag::new("blocked-cmds", FlagKind::Set(Box::new(FlagKind::String))));
pub static ALLOWED_CMDS: Lazy<Flag> =
    Lazy::new(|| Flag::new("allowed-cmds", FlagKind::Set(Box::new(FlagKind::String))));

pub static GAME_MODE: Lazy<Flag> = Lazy::new(|| Flag::new("game-mode", FlagKind::Enum(GAME_MODES)));
pub static WEATHER_LOCK: Lazy<Flag> = Lazy::new(|| Flag::new("weather-lock", FlagKind::Enum(WEATHER_TYPES)));
pub static TIME_LOCK: Lazy<Flag> = Lazy::new(|| Flag::new("time-lock", FlagKind::String));

pub static TELEPORT_LOC: Lazy<Flag> = Lazy::new(|| {
    Flag::new("teleport", FlagKind::Vector).with_default_group(RegionGroup::Members)
});
pub static SPAWN_LOC: Lazy<Flag> = Lazy::new(|| {
    Flag::new("spawn", FlagKind::Vector).with_default_group(RegionGroup::Members)
});

/// Every built-in flag, in registration order.
pub fn all() -> Vec<&'static Flag> {
    vec![
        &PASSTHROUGH, &BUILD, &INTERACT, &BLOCK_BREAK, &BLOCK_PLACE, &USE,
        &DAMAGE_ANIMALS, &PVP, &MOB_DAMAGE, &MOB_SPAWNING, &CREEPER_EXPLOSION,
        &TNT, &LIGHTER, &FIRE_SPREAD, &LAVA_FIRE, &LIGHTNING, &CHEST_ACCESS,
        &SLEEP, &RESPAWN_ANCHORS, &VEHICLE_PLACE, &VEHICLE_DESTROY, &ITEM_PICKUP,
        &ITEM_DROP, &ENTRY, &EXIT, &INVINCIBILITY, &FALL_DAMAGE, &GREETING,
        &FAREWELL, &DENY_MESSAGE, &ENTRY_DENY_MESSAGE, &EXIT_DENY_MESSAGE,
        &NOTIFY_ENTER, &NOTIFY_LEAVE, &HEAL_DELAY, &HEAL_AMOUNT, &MIN_HEAL,
        &MAX_HEAL, &PRICE, &BUYABLE, &DENY_SPAWN, &BLOCKED_CMDS, &ALLOWED_CMDS,
        &GAME_MODE, &WEATHER_LOCK, &TIME_LOCK, &TELEPORT_LOC, &SPAWN_LOC,
    ]
    .into_iter()
    .map(|flag| &**flag)
    .collect()
}
