pub mod policy;
pub mod recommender;

pub use policy::{MdpPolicy, RewardTable, StateDistribution, TransitionTable};
pub use recommender::MdpRecommender;
