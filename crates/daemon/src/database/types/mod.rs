mod daddress;
mod dpublic_key;

pub use daddress::DAddress;
pub use dpublic_key::DPublicKey;
