use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, Encode, Sqlite, Type};

use common::crypto::PublicKey;

/// Public key column, stored as its canonical base64 text
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct DPublicKey(PublicKey);

impl From<DPublicKey> for PublicKey {
    fn from(val: DPublicKey) -> Self {
        val.0
    }
}

impl From<PublicKey> for DPublicKey {
    fn from(key: PublicKey) -> Self {
        Self(key)
    }
}

impl From<&PublicKey> for DPublicKey {
    fn from(key: &PublicKey) -> Self {
        Self(*key)
    }
}

impl Decode<'_, Sqlite> for DPublicKey {
    fn decode(value: SqliteValueRef<'_>) -> Result<Self, BoxDynError> {
        let s = <String as Decode<Sqlite>>::decode(value)?;
        Ok(Self(PublicKey::from_base64(&s)?))
    }
}

impl Encode<'_, Sqlite> for DPublicKey {
    fn encode_by_ref(
        &self,
        args: &mut Vec<SqliteArgumentValue<'_>>,
    ) -> Result<IsNull, BoxDynError> {
        args.push(SqliteArgumentValue::Text(self.0.to_base64().into()));
        Ok(IsNull::No)
    }
}

impl Type<Sqlite> for DPublicKey {
    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <String as Type<Sqlite>>::compatible(ty)
    }

    fn type_info() -> SqliteTypeInfo {
        <String as Type<Sqlite>>::type_info()
    }
}
