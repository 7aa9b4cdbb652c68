//! Check-in pipeline: locate, fence, key, submit, store.

mod daily_key;
mod geolocation;
mod proximity;
mod record_store;
mod registrar;
mod wallet_session;

pub use daily_key::{DailyKey, DailyKeyIssuer, KeyScope};
pub use geolocation::GeolocationAcquirer;
pub use proximity::{haversine_km, Geofence, ProximityCheck, EARTH_RADIUS_KM};
pub use record_store::{LocalStore, ATTENDANCE_RECORDS_KEY, WALLET_ADDRESS_KEY};
pub use registrar::{
    today, Receipt, Registrar, RegistrarOptions, RegistrarParts, Submission, VerifiedLocation,
};
pub use wallet_session::{format_ether, WalletSession, WalletStatus};
