//! 请求与响应 DTO

mod request;
mod response;

pub use request::{
    AdjustPointsRequest, ApplyReferralRequest, CompleteReferralRequest, CreateReferralRequest,
    EarnPointsRequest, EnrollRequest, ExpirePointsRequest, ListReferralsQuery,
    RedeemPointsRequest, StayRequest,
};
pub use response::{ApiResponse, DeleteAccountResponse};
