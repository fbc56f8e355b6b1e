//! Grapple fuel.

use bevy::prelude::*;

use crate::config::GrappleConfig;

/// Fuel reservoir shared by both hooks.
///
/// The capacity lives in [`GrappleConfig::max_fuel`] and is passed in on every
/// refill, so replacing the config at runtime takes effect on the next tick.
/// Spending resets the recharge delay; recharge itself is only driven while no
/// hook is active.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct FuelTank {
    fuel: f32,
    recharge_timer: f32,
}

impl FuelTank {
    /// A full tank.
    pub fn full(max_fuel: f32) -> Self {
        Self {
            fuel: max_fuel.max(0.0),
            recharge_timer: 0.0,
        }
    }

    /// Remaining fuel.
    pub fn fuel(&self) -> f32 {
        self.fuel
    }

    /// Time left before recharge begins.
    pub fn recharge_timer(&self) -> f32 {
        self.recharge_timer
    }

    /// Check if `cost` can be paid.
    pub fn can_afford(&self, cost: f32) -> bool {
        self.fuel >= cost
    }

    /// Pay `cost`, clamping at zero, and restart the recharge delay.
    pub fn spend(&mut self, cost: f32, recharge_delay: f32) {
        self.fuel = (self.fuel - cost.max(0.0)).max(0.0);
        self.recharge_timer = recharge_delay.max(0.0);
    }

    /// Count down the recharge delay, then refill linearly up to `config.max_fuel`.
    pub fn recharge(&mut self, config: &GrappleConfig, dt: f32) {
        if self.recharge_timer > 0.0 {
            self.recharge_timer = (self.recharge_timer - dt).max(0.0);
        } else {
            self.fuel += config.fuel_recharge_rate * dt;
        }
        self.clamp_to(config.max_fuel);
    }

    /// Drop any fuel above `max_fuel`.
    pub fn clamp_to(&mut self, max_fuel: f32) {
        self.fuel = self.fuel.clamp(0.0, max_fuel.max(0.0));
    }

    /// Overwrite the fuel level, clamped to `[0, max_fuel]`.
    pub fn set_fuel(&mut self, fuel: f32, max_fuel: f32) {
        self.fuel = fuel;
        self.clamp_to(max_fuel);
    }
}

impl Default for FuelTank {
    fn default() -> Self {
        Self::full(GrappleConfig::default().max_fuel)
    }
}
