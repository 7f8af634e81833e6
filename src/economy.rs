//! Upgrade shop
//!
//! The catalog is a table of linear cost curves. One routine computes every
//! cost and one applies every effect.

use serde::{Deserialize, Serialize};

use crate::persistence::{ProgressRecord, Upgrades};

/// Upgrade identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeId {
    Jump,
    DoubleJump,
    Speed,
    Hp,
}

impl UpgradeId {
    pub const ALL: [UpgradeId; 4] = [
        UpgradeId::Jump,
        UpgradeId::DoubleJump,
        UpgradeId::Speed,
        UpgradeId::Hp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UpgradeId::Jump => "jump",
            UpgradeId::DoubleJump => "doubleJump",
            UpgradeId::Speed => "speed",
            UpgradeId::Hp => "hp",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "jump" => Some(UpgradeId::Jump),
            "doubleJump" | "double_jump" => Some(UpgradeId::DoubleJump),
            "speed" => Some(UpgradeId::Speed),
            "hp" => Some(UpgradeId::Hp),
            _ => None,
        }
    }
}

/// Which upgrade stat an entry reads and modifies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeField {
    JumpPower,
    DoubleJump,
    Speed,
    MaxHp,
}

impl UpgradeField {
    /// Current value (flags read as 0/1)
    fn get(&self, upgrades: &Upgrades) -> u32 {
        match self {
            UpgradeField::JumpPower => upgrades.jump_power,
            UpgradeField::DoubleJump => upgrades.double_jump as u32,
            UpgradeField::Speed => upgrades.speed,
            UpgradeField::MaxHp => upgrades.max_hp,
        }
    }

    fn add(&self, upgrades: &mut Upgrades, delta: u32) {
        match self {
            UpgradeField::JumpPower => upgrades.jump_power += delta,
            UpgradeField::DoubleJump => upgrades.double_jump = delta > 0,
            UpgradeField::Speed => upgrades.speed += delta,
            UpgradeField::MaxHp => upgrades.max_hp += delta,
        }
    }
}

/// One row of the upgrade table
#[derive(Debug, Clone, Copy)]
pub struct UpgradeSpec {
    pub id: UpgradeId,
    pub name: &'static str,
    pub description: &'static str,
    pub base_cost: u64,
    /// Extra cost per point above `baseline`
    pub increment: u64,
    pub field: UpgradeField,
    pub baseline: u32,
    pub delta: u32,
    /// Can only be bought once
    pub one_time: bool,
}

impl UpgradeSpec {
    /// Price given the current upgrades
    pub fn cost(&self, upgrades: &Upgrades) -> u64 {
        let above = self.field.get(upgrades).saturating_sub(self.baseline);
        self.base_cost + above as u64 * self.increment
    }

    pub fn is_owned(&self, upgrades: &Upgrades) -> bool {
        self.one_time && self.field.get(upgrades) > 0
    }

    pub fn apply(&self, upgrades: &mut Upgrades) {
        self.field.add(upgrades, self.delta);
    }
}

/// The full upgrade catalog
pub const CATALOG: [UpgradeSpec; 4] = [
    UpgradeSpec {
        id: UpgradeId::Jump,
        name: "Higher jump",
        description: "+2 jump power",
        base_cost: 30,
        increment: 2,
        field: UpgradeField::JumpPower,
        baseline: Upgrades::BASE_JUMP_POWER,
        delta: 2,
        one_time: false,
    },
    UpgradeSpec {
        id: UpgradeId::DoubleJump,
        name: "Double jump",
        description: "Jump again in mid-air",
        base_cost: 80,
        increment: 0,
        field: UpgradeField::DoubleJump,
        baseline: 0,
        delta: 1,
        one_time: true,
    },
    UpgradeSpec {
        id: UpgradeId::Speed,
        name: "Faster run",
        description: "+1 speed",
        base_cost: 25,
        increment: 3,
        field: UpgradeField::Speed,
        baseline: Upgrades::BASE_SPEED,
        delta: 1,
        one_time: false,
    },
    UpgradeSpec {
        id: UpgradeId::Hp,
        name: "+1 HP",
        description: "Raise max health",
        base_cost: 50,
        increment: 10,
        field: UpgradeField::MaxHp,
        baseline: Upgrades::BASE_MAX_HP,
        delta: 1,
        one_time: false,
    },
];

pub fn spec(id: UpgradeId) -> &'static UpgradeSpec {
    match id {
        UpgradeId::Jump => &CATALOG[0],
        UpgradeId::DoubleJump => &CATALOG[1],
        UpgradeId::Speed => &CATALOG[2],
        UpgradeId::Hp => &CATALOG[3],
    }
}

/// Current price of an upgrade
pub fn cost(id: UpgradeId, upgrades: &Upgrades) -> u64 {
    spec(id).cost(upgrades)
}

/// Why a purchase was refused. Nothing changes on refusal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseError {
    #[error("not enough coins: need {cost}, have {currency}")]
    InsufficientFunds { cost: u64, currency: u64 },
    #[error("{} is already owned", .0.as_str())]
    AlreadyOwned(UpgradeId),
    #[error("the shop is closed")]
    ShopClosed,
}

/// A completed purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Purchase {
    pub id: UpgradeId,
    pub cost: u64,
    /// Coins left afterwards
    pub remaining: u64,
}

/// Validate and apply a purchase against the record
pub fn purchase(record: &mut ProgressRecord, id: UpgradeId) -> Result<Purchase, PurchaseError> {
    let spec = spec(id);
    if spec.is_owned(&record.upgrades) {
        return Err(PurchaseError::AlreadyOwned(id));
    }

    let cost = spec.cost(&record.upgrades);
    if record.currency < cost {
        return Err(PurchaseError::InsufficientFunds {
            cost,
            currency: record.currency,
        });
    }

    record.currency -= cost;
    spec.apply(&mut record.upgrades);
    log::info!("Bought {} for {} coins", id.as_str(), cost);

    Ok(Purchase {
        id,
        cost,
        remaining: record.currency,
    })
}

/// One line in the shop view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShopOffer {
    pub id: UpgradeId,
    pub name: &'static str,
    pub description: &'static str,
    pub cost: u64,
    pub affordable: bool,
    pub owned: bool,
}

impl ShopOffer {
    /// Whether the buy button should be enabled
    pub fn available(&self) -> bool {
        self.affordable && !self.owned
    }
}

/// Offers computed from the current record (never cached)
pub fn shop_offers(record: &ProgressRecord) -> Vec<ShopOffer> {
    CATALOG
        .iter()
        .map(|spec| {
            let cost = spec.cost(&record.upgrades);
            ShopOffer {
                id: spec.id,
                name: spec.name,
                description: spec.description,
                cost,
                affordable: record.currency >= cost,
                owned: spec.is_owned(&record.upgrades),
            }
        })
        .collect()
}
