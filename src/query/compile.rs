use crate::catalog::types::Value;
use crate::error::ConferenceError;
use crate::query::fields::FilterField;
use crate::query::plan::{Filter, Operator, RawFilter};

pub(crate) const INVALID_FIELD_OR_OPERATOR: &str = "filter contains invalid field or operator";
pub(crate) const SECOND_INEQUALITY_FIELD: &str = "inequality filter allowed on only one field";

/// One criterion after validation: canonical field, canonical operator and
/// an operand already coerced to the field's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFilter<F> {
    pub field: F,
    pub op: Operator,
    pub value: Value,
}

impl<F: FilterField> CompiledFilter<F> {
    pub fn resolve(raw: &RawFilter) -> Result<Self, ConferenceError> {
        let field = F::from_token(&raw.field);
        let op = Operator::from_token(&raw.operator);
        let (Some(field), Some(op)) = (field, op) else {
            return Err(ConferenceError::invalid(INVALID_FIELD_OR_OPERATOR));
        };
        let value = field.coerce(&raw.value)?;
        Ok(Self { field, op, value })
    }

    pub fn to_store_filter(&self) -> Filter {
        Filter::new(self.field.property(), self.op, self.value.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFilters<F> {
    pub inequality_field: Option<F>,
    pub filters: Vec<CompiledFilter<F>>,
}

impl<F> Default for CompiledFilters<F> {
    fn default() -> Self {
        Self {
            inequality_field: None,
            filters: Vec::new(),
        }
    }
}

/// Validates and normalizes caller criteria for the field set `F`.
///
/// The store can combine at most one inequality-constrained property with an
/// ordering, so a second distinct inequality field is rejected here rather
/// than at execution time. Several inequalities on the same field are fine.
pub fn compile_filters<F: FilterField>(
    raw: &[RawFilter],
) -> Result<CompiledFilters<F>, ConferenceError> {
    let mut compiled = CompiledFilters::default();
    for criterion in raw {
        let filter = CompiledFilter::<F>::resolve(criterion)?;
        if filter.op.is_inequality() {
            match compiled.inequality_field {
                Some(existing) if existing != filter.field => {
                    return Err(ConferenceError::invalid(SECOND_INEQUALITY_FIELD));
                }
                _ => compiled.inequality_field = Some(filter.field),
            }
        }
        compiled.filters.push(filter);
    }
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::compile_filters;
    use crate::catalog::types::Value;
    use crate::query::fields::{ConferenceField, SessionField};
    use crate::query::plan::{Operator, RawFilter};
    use proptest::prelude::*;

    #[test]
    fn normalizes_fields_operators_and_values() {
        let compiled = compile_filters::<ConferenceField>(&[
            RawFilter::new("city", "eq", "London"),
            RawFilter::new("MAX_ATTENDEES", "gt", "10"),
        ])
        .expect("compile");
        assert_eq!(compiled.inequality_field, Some(ConferenceField::MaxAttendees));
        assert_eq!(compiled.filters.len(), 2);
        let store = compiled.filters[1].to_store_filter();
        assert_eq!(store.property, "maxAttendees");
        assert_eq!(store.op, Operator::Gt);
        assert_eq!(store.value, Value::Integer(10));
    }

    #[test]
    fn equality_only_criteria_have_no_inequality_field() {
        let compiled =
            compile_filters::<SessionField>(&[RawFilter::new("SPEAKER", "EQ", "Grace")])
                .expect("compile");
        assert_eq!(compiled.inequality_field, None);
    }

    #[test]
    fn unknown_field_or_operator_is_invalid() {
        for raw in [
            RawFilter::new("VENUE", "EQ", "x"),
            RawFilter::new("CITY", "LIKE", "x"),
            RawFilter::new("SPEAKER", "EQ", "x"),
        ] {
            let err = compile_filters::<ConferenceField>(&[raw]).expect_err("invalid");
            assert_eq!(err.code_str(), "invalid_argument");
            assert!(err.to_string().contains("invalid field or operator"));
        }
    }

    #[test]
    fn second_inequality_field_is_rejected() {
        let err = compile_filters::<SessionField>(&[
            RawFilter::new("DURATION", "GT", "30"),
            RawFilter::new("TYPEOFSESSION", "EQ", "Workshop"),
            RawFilter::new("STARTTIME", "LT", "19:00"),
        ])
        .expect_err("two inequality fields");
        assert_eq!(err.code_str(), "invalid_argument");
        assert!(err.to_string().contains("only one field"));
    }

    #[test]
    fn range_on_one_field_is_allowed() {
        let compiled = compile_filters::<ConferenceField>(&[
            RawFilter::new("MONTH", "GTEQ", "3"),
            RawFilter::new("MONTH", "LT", "6"),
        ])
        .expect("range on one field");
        assert_eq!(compiled.inequality_field, Some(ConferenceField::Month));
    }

    fn arb_op_token() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec!["EQ", "GT", "GTEQ", "LT", "LTEQ", "NE"])
    }

    fn arb_inequality_token() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec!["GT", "GTEQ", "LT", "LTEQ", "NE"])
    }

    proptest! {
        #[test]
        fn at_most_one_inequality_field_always_compiles(
            ineq_op in arb_inequality_token(),
            eq_count in 0usize..4,
            month in 1i64..=12,
        ) {
            let mut raw = vec![RawFilter::new("MONTH", ineq_op, &month.to_string())];
            for idx in 0..eq_count {
                raw.push(RawFilter::new("CITY", "EQ", &format!("city-{idx}")));
            }
            let compiled = compile_filters::<ConferenceField>(&raw);
            prop_assert!(compiled.is_ok());
            prop_assert_eq!(
                compiled.expect("checked").inequality_field,
                Some(ConferenceField::Month)
            );
        }

        #[test]
        fn two_distinct_inequality_fields_never_compile(
            first in arb_inequality_token(),
            second in arb_inequality_token(),
            filler in arb_op_token(),
        ) {
            let raw = vec![
                RawFilter::new("MAX_ATTENDEES", first, "100"),
                RawFilter::new("MAX_ATTENDEES", filler, "50"),
                RawFilter::new("MONTH", second, "4"),
            ];
            let err = compile_filters::<ConferenceField>(&raw);
            prop_assert!(err.is_err());
            prop_assert_eq!(err.expect_err("checked").code_str(), "invalid_argument");
        }
    }
}
