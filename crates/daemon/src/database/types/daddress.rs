use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, Encode, Sqlite, Type};

use common::address::Address;

/// Node address column, stored as it is displayed
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DAddress(Address);

impl From<DAddress> for Address {
    fn from(val: DAddress) -> Self {
        val.0
    }
}

impl From<Address> for DAddress {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl From<&Address> for DAddress {
    fn from(address: &Address) -> Self {
        Self(address.clone())
    }
}

impl Decode<'_, Sqlite> for DAddress {
    fn decode(value: SqliteValueRef<'_>) -> Result<Self, BoxDynError> {
        let s = <String as Decode<Sqlite>>::decode(value)?;
        Ok(Self(Address::parse(&s)?))
    }
}

impl Encode<'_, Sqlite> for DAddress {
    fn encode_by_ref(
        &self,
        args: &mut Vec<SqliteArgumentValue<'_>>,
    ) -> Result<IsNull, BoxDynError> {
        args.push(SqliteArgumentValue::Text(self.0.to_string().into()));
        Ok(IsNull::No)
    }
}

impl Type<Sqlite> for DAddress {
    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <String as Type<Sqlite>>::compatible(ty)
    }

    fn type_info() -> SqliteTypeInfo {
        <String as Type<Sqlite>>::type_info()
    }
}
