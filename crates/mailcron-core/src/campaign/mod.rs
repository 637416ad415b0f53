//! Campaigns: scheduled mailings with a time window and a repeat period.

mod model;
mod repository;

pub use model::{
    Campaign, CampaignId, CampaignStatus, NewCampaign, PeriodId, RepeatPeriod, StatusCounts,
};
pub use repository::CampaignRepository;
