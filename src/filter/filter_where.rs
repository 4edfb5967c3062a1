use serde_json::Value;

use super::error::FilterError;
use super::types::{json_path_sql, text_path_sql, Condition, FilterOp, FilterWhereInfo};

pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Parse a Mongo-style where object into a condition tree
    pub fn parse(where_data: &Value) -> Result<Condition, FilterError> {
        let max_depth = crate::config::CONFIG.filter.max_nested_depth;
        Self::parse_at(where_data, 0, max_depth)
    }

    /// Render a condition as SQL over the `doc` jsonb column, numbering params from `starting_param_index + 1`
    pub fn generate(condition: &Condition, starting_param_index: usize) -> (String, Vec<Value>) {
        let mut filter_where = Self::new(starting_param_index);
        let sql = filter_where.build(condition);
        (sql, filter_where.param_values)
    }

    fn parse_at(where_data: &Value, depth: u32, max_depth: u32) -> Result<Condition, FilterError> {
        if depth > max_depth {
            return Err(FilterError::TooDeep(max_depth));
        }
        let obj = match where_data {
            Value::Null => return Ok(Condition::And(vec![])),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        };

        let mut conditions = Vec::new();
        for (key, value) in obj {
            if key.starts_with('$') {
                conditions.push(Self::parse_logical_operator(key, value, depth, max_depth)?);
            } else {
                conditions.extend(Self::parse_field_condition(key, value)?);
            }
        }

        if conditions.len() == 1 {
            Ok(conditions.remove(0))
        } else {
            Ok(Condition::And(conditions))
        }
    }

    fn parse_logical_operator(op: &str, value: &Value, depth: u32, max_depth: u32) -> Result<Condition, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let parts = arr
                    .iter()
                    .map(|v| Self::parse_at(v, depth + 1, max_depth))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(if op == "$and" { Condition::And(parts) } else { Condition::Or(parts) })
            }
            "$not" => Ok(Condition::Not(Box::new(Self::parse_at(value, depth + 1, max_depth)?))),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<Condition>, FilterError> {
        let path = Self::parse_path(field)?;

        // `{ field: { $op: .. } }` only when every key is an operator; plain objects compare by equality
        if let Value::Object(obj) = value {
            if !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')) {
                return obj
                    .iter()
                    .map(|(op_key, op_val)| {
                        let operator = Self::map_operator(op_key)?;
                        Self::validate_operand(operator, op_val)?;
                        Ok(Condition::Field(FilterWhereInfo {
                            path: path.clone(),
                            operator,
                            data: op_val.clone(),
                        }))
                    })
                    .collect();
            }
        }

        // Implicit equality: { field: value }
        Ok(vec![Condition::Field(FilterWhereInfo {
            path,
            operator: FilterOp::Eq,
            data: value.clone(),
        })])
    }

    /// Dotted path with `[A-Za-z0-9_]` segments; paths are embedded in SQL text
    pub fn parse_path(field: &str) -> Result<Vec<String>, FilterError> {
        let segments: Vec<String> = field.split('.').map(str::to_string).collect();
        let valid = segments
            .iter()
            .all(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        if !valid {
            return Err(FilterError::InvalidColumn(field.to_string()));
        }
        Ok(segments)
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$between" => FilterOp::Between,
            "$exists" => FilterOp::Exists,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn validate_operand(operator: FilterOp, data: &Value) -> Result<(), FilterError> {
        match operator {
            FilterOp::In | FilterOp::NIn if !data.is_array() => {
                Err(FilterError::InvalidOperatorData("$in/$nin require an array".to_string()))
            }
            FilterOp::Between if data.as_array().map(|a| a.len()) != Some(2) => {
                Err(FilterError::InvalidOperatorData("$between requires exactly 2 values".to_string()))
            }
            FilterOp::Like | FilterOp::ILike if !data.is_string() => {
                Err(FilterError::InvalidOperatorData("$like/$ilike require a string pattern".to_string()))
            }
            FilterOp::Exists if !data.is_boolean() => {
                Err(FilterError::InvalidOperatorData("$exists requires true or false".to_string()))
            }
            _ => Ok(()),
        }
    }

    fn build(&mut self, condition: &Condition) -> String {
        match condition {
            Condition::And(parts) if parts.is_empty() => "TRUE".to_string(),
            Condition::Or(parts) if parts.is_empty() => "FALSE".to_string(),
            Condition::And(parts) => self.join(parts, " AND "),
            Condition::Or(parts) => self.join(parts, " OR "),
            Condition::Not(inner) => format!("NOT ({})", self.build(inner)),
            Condition::Field(info) => self.build_sql_condition(info),
        }
    }

    fn join(&mut self, parts: &[Condition], joiner: &str) -> String {
        let sql: Vec<String> = parts.iter().map(|p| format!("({})", self.build(p))).collect();
        sql.join(joiner)
    }

    /// Leaves never evaluate to SQL NULL so that `NOT` behaves like the in-memory matcher
    fn build_sql_condition(&mut self, info: &FilterWhereInfo) -> String {
        let column = json_path_sql(&info.path);
        match info.operator {
            FilterOp::Eq if info.data.is_null() => {
                format!("({column} IS NULL OR {column} = 'null'::jsonb)")
            }
            FilterOp::Eq => {
                format!("COALESCE({column} = {}, FALSE)", self.param(info.data.clone()))
            }
            FilterOp::Ne if info.data.is_null() => {
                format!("({column} IS NOT NULL AND {column} <> 'null'::jsonb)")
            }
            FilterOp::Ne => {
                format!("COALESCE({column} <> {}, TRUE)", self.param(info.data.clone()))
            }
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                let op = info.operator.comparison_sql().unwrap_or("=");
                let param = self.param(info.data.clone());
                format!("COALESCE(jsonb_typeof({column}) = jsonb_typeof({param}) AND {column} {op} {param}, FALSE)")
            }
            FilterOp::Like | FilterOp::ILike => {
                let op = if info.operator == FilterOp::Like { "LIKE" } else { "ILIKE" };
                let param = self.param(info.data.clone());
                format!(
                    "COALESCE(jsonb_typeof({column}) = 'string' AND {} {op} ({param} #>> '{{}}'), FALSE)",
                    text_path_sql(&info.path)
                )
            }
            FilterOp::In | FilterOp::NIn => {
                let values = info.data.as_array().cloned().unwrap_or_default();
                let negate = info.operator == FilterOp::NIn;
                if values.is_empty() {
                    return if negate { "TRUE".to_string() } else { "FALSE".to_string() };
                }
                let params: Vec<String> = values.into_iter().map(|v| self.param(v)).collect();
                if negate {
                    format!("COALESCE({column} NOT IN ({}), TRUE)", params.join(", "))
                } else {
                    format!("COALESCE({column} IN ({}), FALSE)", params.join(", "))
                }
            }
            FilterOp::Between => {
                let values = info.data.as_array().cloned().unwrap_or_default();
                let low = self.param(values.first().cloned().unwrap_or(Value::Null));
                let high = self.param(values.get(1).cloned().unwrap_or(Value::Null));
                format!(
                    "COALESCE(jsonb_typeof({column}) = jsonb_typeof({low}) AND {column} >= {low} AND {column} <= {high}, FALSE)"
                )
            }
            FilterOp::Exists => {
                if info.data.as_bool().unwrap_or(true) {
                    format!("{column} IS NOT NULL")
                } else {
                    format!("{column} IS NULL")
                }
            }
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sql(where_data: Value) -> (String, Vec<Value>) {
        let condition = FilterWhere::parse(&where_data).unwrap();
        FilterWhere::generate(&condition, 0)
    }

    #[test]
    fn implicit_equality_uses_jsonb_params() {
        let (query, params) = sql(json!({ "status": 1 }));
        assert_eq!(query, "COALESCE(doc #> '{status}' = $1, FALSE)");
        assert_eq!(params, vec![json!(1)]);
    }

    #[test]
    fn dotted_paths_and_param_numbering() {
        let (query, params) = sql(json!({ "emailData.subject": { "$ilike": "%contract%" }, "status": 1 }));
        assert!(query.contains("doc #>> '{emailData,subject}' ILIKE ($1 #>> '{}')"));
        assert!(query.contains("doc #> '{status}' = $2"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn logical_operators_nest() {
        let (query, params) = sql(json!({
            "$or": [{ "userId": "a" }, { "email": { "$in": ["x@y.z", "q@y.z"] } }]
        }));
        assert!(query.contains(" OR "));
        assert!(query.contains("IN ($2, $3)"));
        assert_eq!(params.len(), 3);

        let (query, _) = sql(json!({ "$not": { "status": 0 } }));
        assert!(query.starts_with("NOT ("));
    }

    #[test]
    fn null_equality_matches_missing() {
        let (query, params) = sql(json!({ "parentId": null }));
        assert_eq!(query, "(doc #> '{parentId}' IS NULL OR doc #> '{parentId}' = 'null'::jsonb)");
        assert!(params.is_empty());
    }

    #[test]
    fn empty_in_lists_short_circuit() {
        assert_eq!(sql(json!({ "_id": { "$in": [] } })).0, "FALSE");
        assert_eq!(sql(json!({ "_id": { "$nin": [] } })).0, "TRUE");
    }

    #[test]
    fn operator_objects_require_operator_keys() {
        // A plain nested object is an equality test, not an operator map
        let condition = FilterWhere::parse(&json!({ "styling": { "font": "serif" } })).unwrap();
        match condition {
            Condition::Field(info) => assert_eq!(info.operator, FilterOp::Eq),
            other => panic!("unexpected condition {:?}", other),
        }
    }

    #[test]
    fn rejects_unsafe_paths_and_bad_operands() {
        assert!(FilterWhere::parse(&json!({ "a'; drop table users; --": 1 })).is_err());
        assert!(FilterWhere::parse(&json!({ "a..b": 1 })).is_err());
        assert!(FilterWhere::parse(&json!({ "a": { "$regex": "x" } })).is_err());
        assert!(FilterWhere::parse(&json!({ "a": { "$between": [1] } })).is_err());
        assert!(FilterWhere::parse(&json!({ "a": { "$in": 3 } })).is_err());
        assert!(FilterWhere::parse(&json!(["a"])).is_err());
    }

    #[test]
    fn rejects_excessive_nesting() {
        let mut clause = json!({ "status": 1 });
        for _ in 0..20 {
            clause = json!({ "$and": [clause] });
        }
        assert!(matches!(FilterWhere::parse(&clause), Err(FilterError::TooDeep(_))));
    }
}
