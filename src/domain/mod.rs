pub mod iac;
pub mod image_identity;
pub mod scanresult;
