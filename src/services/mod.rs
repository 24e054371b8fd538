// Analytics and Reporting
pub mod forecasting;
