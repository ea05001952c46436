pub mod findings;
pub mod scan_result;
pub mod scan_status;
pub mod severity;
pub mod vulnerability;
