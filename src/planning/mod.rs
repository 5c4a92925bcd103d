pub mod redistribution;
pub mod balance;

pub use redistribution::{
    RedistributionPlan, RedistributionPlanner, Residual, SnapshotMode, StationNeed,
};
pub use balance::{StationBalance, StationRole, SystemBalance};
