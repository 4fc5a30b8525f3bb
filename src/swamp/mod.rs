//! SWAMP maintenance workflow tracker.
//!
//! [`Swamp`] speaks the SOAP API, [`WebSwamp`] drives the HTML interface for
//! the few operations the API does not offer.

mod client;
mod error;
pub mod soap;
mod web;

pub use client::{Swamp, SwampBuilder, SWAMP_URL};
pub use error::{SwampError, SwampResult};
pub use soap::{convert_pu_list, dict_to_map, map_to_dict, PuList, SoapValue};
pub use web::{
    WebSwamp, FIELD_ADDITIONAL_BUGZILLA, FIELD_DATE, FIELD_MAINTAINER, FIELD_PACKAGES,
    WEB_SWAMP_URL,
};
