use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Average,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn as_aql(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Average => "AVERAGE",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }

    /// Suffix of the result key, as in `pages__sum`.
    pub fn key(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Average => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }
}

impl FromStr for AggregateFunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "count" => Ok(AggregateFunction::Count),
            "sum" => Ok(AggregateFunction::Sum),
            "average" | "avg" => Ok(AggregateFunction::Average),
            "min" => Ok(AggregateFunction::Min),
            "max" => Ok(AggregateFunction::Max),
            _ => Err(Error::UnsupportedAggregate(s.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("SUM".parse::<AggregateFunction>(), Ok(AggregateFunction::Sum));
        assert_eq!("Avg".parse::<AggregateFunction>(), Ok(AggregateFunction::Average));
        assert_eq!(
            "median".parse::<AggregateFunction>(),
            Err(Error::UnsupportedAggregate("median".to_string()))
        );
    }
}
