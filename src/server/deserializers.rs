use serde::Deserialize;

// front-ends send question ids either as numbers or as their string form
#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Int(i64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "IdRepr")]
pub struct LenientId(pub i64);

impl TryFrom<IdRepr> for LenientId {
    type Error = String;

    fn try_from(value: IdRepr) -> Result<Self, Self::Error> {
        match value {
            IdRepr::Int(v) => Ok(LenientId(v)),
            IdRepr::Str(s) => match s.trim().parse::<i64>() {
                Ok(v) => Ok(LenientId(v)),
                Err(_) => Err(format!("Wrong value {s}, can not parse to i64")),
            },
        }
    }
}

/// Row id taken from a path segment. Only non-negative integers name a row,
/// anything else is treated as an unknown path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u64")]
pub struct RowId(pub i64);

impl TryFrom<u64> for RowId {
    type Error = String;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(RowId)
            .map_err(|_| format!("Id {value} is out of range"))
    }
}
