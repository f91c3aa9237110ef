use crate::context::TranslationContext;
use crate::fragment::VariableColumn;
use itertools::Itertools;
use relquad_common::error::RelquadResult;
use relquad_common::RelquadError;
use relquad_model::{Expression, NamedNode, Variable};
use relquad_schema::columns::term as term_cols;
use std::collections::BTreeMap;

/// The SQL text a compiled expression produces, tagged with whether it is
/// already boolean (so [`compile_ebv`] can skip re-wrapping it) or a
/// scalar that still needs an effective-boolean-value coercion.
pub struct CompiledExpr {
    pub sql: String,
    pub is_boolean: bool,
}

impl CompiledExpr {
    fn scalar(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            is_boolean: false,
        }
    }

    fn boolean(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            is_boolean: true,
        }
    }
}

/// Reads the resolved lexical text of a bound variable, joining to `term`
/// inline via a scalar subquery when the pattern translator did not
/// already attach a `term` join for this position (spec.md §4.5's "for
/// comparison-only uses it operates on lexical/UUID directly").
fn variable_text_expr(ctx: &TranslationContext<'_>, column: &VariableColumn) -> String {
    if column.computed {
        return column.uuid_expr.clone();
    }
    match &column.term_alias {
        Some(alias) => format!("{alias}.{}", term_cols::TERM_TEXT),
        None => format!(
            "(SELECT {text} FROM {table} WHERE {uuid} = {expr})",
            text = term_cols::TERM_TEXT,
            table = ctx.term_table,
            uuid = term_cols::TERM_UUID,
            expr = column.uuid_expr,
        ),
    }
}

fn variable_column_expr(ctx: &TranslationContext<'_>, column: &VariableColumn, col: &str) -> String {
    if column.computed {
        return format!("NULL /* {col} is undefined for a BIND-computed value */");
    }
    match &column.term_alias {
        Some(alias) => format!("{alias}.{col}"),
        None => format!(
            "(SELECT {col} FROM {table} WHERE {uuid} = {expr})",
            table = ctx.term_table,
            uuid = term_cols::TERM_UUID,
            expr = column.uuid_expr,
        ),
    }
}

/// Compiles a SPARQL expression to a SQL scalar or boolean expression in
/// the scope described by `bindings` (spec.md §4.5). Errors returned here
/// are `TypeError`/`UnsupportedFeature`; callers in a `FILTER` position
/// must suppress `TypeError` per spec.md §7's propagation rule rather than
/// letting it abort the whole query.
pub fn compile_expression(
    ctx: &TranslationContext<'_>,
    bindings: &BTreeMap<Variable, VariableColumn>,
    expr: &Expression,
) -> RelquadResult<CompiledExpr> {
    match expr {
        Expression::NamedNode(nn) => Ok(CompiledExpr::scalar(quote_literal(nn.as_str()))),
        Expression::Literal(lit) => Ok(CompiledExpr::scalar(quote_literal(lit.value()))),
        Expression::Variable(var) => {
            let column = lookup(bindings, var)?;
            Ok(CompiledExpr::scalar(variable_text_expr(ctx, column)))
        }
        Expression::And(l, r) => binary_bool(ctx, bindings, l, r, "AND"),
        Expression::Or(l, r) => binary_bool(ctx, bindings, l, r, "OR"),
        Expression::Not(inner) => {
            let compiled = compile_ebv(ctx, bindings, inner)?;
            Ok(CompiledExpr::boolean(format!("(NOT {compiled})")))
        }
        Expression::Equal(l, r) => binary_compare(ctx, bindings, l, r, "="),
        Expression::SameTerm(l, r) => binary_compare(ctx, bindings, l, r, "="),
        Expression::Greater(l, r) => binary_compare(ctx, bindings, l, r, ">"),
        Expression::GreaterOrEqual(l, r) => binary_compare(ctx, bindings, l, r, ">="),
        Expression::Less(l, r) => binary_compare(ctx, bindings, l, r, "<"),
        Expression::LessOrEqual(l, r) => binary_compare(ctx, bindings, l, r, "<="),
        Expression::Add(l, r) => binary_numeric(ctx, bindings, l, r, "+"),
        Expression::Subtract(l, r) => binary_numeric(ctx, bindings, l, r, "-"),
        Expression::Multiply(l, r) => binary_numeric(ctx, bindings, l, r, "*"),
        Expression::Divide(l, r) => binary_numeric(ctx, bindings, l, r, "/"),
        Expression::UnaryPlus(inner) => {
            let compiled = compile_expression(ctx, bindings, inner)?;
            Ok(CompiledExpr::scalar(format!("(+{})", cast_numeric(&compiled.sql))))
        }
        Expression::UnaryMinus(inner) => {
            let compiled = compile_expression(ctx, bindings, inner)?;
            Ok(CompiledExpr::scalar(format!("(-{})", cast_numeric(&compiled.sql))))
        }
        Expression::In(needle, haystack) => {
            let needle = compile_expression(ctx, bindings, needle)?.sql;
            let options = haystack
                .iter()
                .map(|item| compile_expression(ctx, bindings, item).map(|c| c.sql))
                .collect::<RelquadResult<Vec<_>>>()?;
            Ok(CompiledExpr::boolean(format!("({needle} IN ({}))", options.join(", "))))
        }
        Expression::Bound(var) => Ok(CompiledExpr::boolean(format!(
            "({} IS NOT NULL)",
            lookup(bindings, var)?.uuid_expr
        ))),
        Expression::If(cond, then, otherwise) => {
            let cond = compile_ebv(ctx, bindings, cond)?;
            let then = compile_expression(ctx, bindings, then)?.sql;
            let otherwise = compile_expression(ctx, bindings, otherwise)?.sql;
            Ok(CompiledExpr::scalar(format!("(CASE WHEN {cond} THEN {then} ELSE {otherwise} END)")))
        }
        Expression::Coalesce(options) => {
            let options = options
                .iter()
                .map(|item| compile_expression(ctx, bindings, item).map(|c| c.sql))
                .collect::<RelquadResult<Vec<_>>>()?;
            Ok(CompiledExpr::scalar(format!("COALESCE({})", options.join(", "))))
        }
        Expression::Exists(_) => Err(RelquadError::unsupported_feature(
            "EXISTS is only supported directly inside a FILTER (optionally under AND/OR/NOT), \
             not nested inside another expression such as IF or COALESCE",
        )),
        Expression::FunctionCall(function, args) => compile_function(ctx, bindings, function, args),
    }
}

/// Wraps a compiled expression in SPARQL's effective-boolean-value rule
/// (spec.md §4.5): an already-boolean expression is used as-is; a scalar
/// coerces via `NULLIF`/length/zero checks; the caller (the `Filter`
/// translation) is responsible for catching a `TypeError` and excluding
/// the row instead of aborting, per spec.md §7.
pub fn compile_ebv(
    ctx: &TranslationContext<'_>,
    bindings: &BTreeMap<Variable, VariableColumn>,
    expr: &Expression,
) -> RelquadResult<String> {
    let compiled = compile_expression(ctx, bindings, expr)?;
    if compiled.is_boolean {
        return Ok(compiled.sql);
    }
    Ok(format!(
        "({value} IS NOT NULL AND {value} <> '' AND {value} <> '0')",
        value = compiled.sql,
    ))
}

fn lookup<'a>(bindings: &'a BTreeMap<Variable, VariableColumn>, var: &Variable) -> RelquadResult<&'a VariableColumn> {
    bindings
        .get(var)
        .ok_or_else(|| RelquadError::Type(format!("variable ?{} is not bound in this scope", var.as_str())))
}

fn binary_bool(
    ctx: &TranslationContext<'_>,
    bindings: &BTreeMap<Variable, VariableColumn>,
    l: &Expression,
    r: &Expression,
    op: &str,
) -> RelquadResult<CompiledExpr> {
    let l = compile_ebv(ctx, bindings, l)?;
    let r = compile_ebv(ctx, bindings, r)?;
    Ok(CompiledExpr::boolean(format!("({l} {op} {r})")))
}

fn binary_compare(
    ctx: &TranslationContext<'_>,
    bindings: &BTreeMap<Variable, VariableColumn>,
    l: &Expression,
    r: &Expression,
    op: &str,
) -> RelquadResult<CompiledExpr> {
    let l = compile_expression(ctx, bindings, l)?.sql;
    let r = compile_expression(ctx, bindings, r)?.sql;
    Ok(CompiledExpr::boolean(format!("({l} {op} {r})")))
}

fn binary_numeric(
    ctx: &TranslationContext<'_>,
    bindings: &BTreeMap<Variable, VariableColumn>,
    l: &Expression,
    r: &Expression,
    op: &str,
) -> RelquadResult<CompiledExpr> {
    let l = compile_expression(ctx, bindings, l)?.sql;
    let r = compile_expression(ctx, bindings, r)?.sql;
    Ok(CompiledExpr::scalar(format!("({} {op} {})", cast_numeric(&l), cast_numeric(&r))))
}

fn cast_numeric(sql: &str) -> String {
    format!("CAST({sql} AS DOUBLE PRECISION)")
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn compile_function(
    ctx: &TranslationContext<'_>,
    bindings: &BTreeMap<Variable, VariableColumn>,
    function: &relquad_model::Function,
    args: &[Expression],
) -> RelquadResult<CompiledExpr> {
    use relquad_model::Function;

    let arg_sql = |i: usize| -> RelquadResult<String> {
        args.get(i)
            .ok_or_else(|| RelquadError::Type(format!("missing argument {i}")))
            .and_then(|expr| compile_expression(ctx, bindings, expr).map(|c| c.sql))
    };

    match function {
        Function::Str => Ok(CompiledExpr::scalar(arg_sql(0)?)),
        Function::Lang => variable_arg_column(ctx, bindings, args, 0, term_cols::LANG).map(CompiledExpr::scalar),
        Function::Datatype => {
            variable_arg_column(ctx, bindings, args, 0, term_cols::DATATYPE).map(CompiledExpr::scalar)
        }
        Function::Abs => Ok(CompiledExpr::scalar(format!("ABS({})", cast_numeric(&arg_sql(0)?)))),
        Function::Ceil => Ok(CompiledExpr::scalar(format!("CEIL({})", cast_numeric(&arg_sql(0)?)))),
        Function::Floor => Ok(CompiledExpr::scalar(format!("FLOOR({})", cast_numeric(&arg_sql(0)?)))),
        Function::Round => Ok(CompiledExpr::scalar(format!("ROUND({})", cast_numeric(&arg_sql(0)?)))),
        Function::StrLen => Ok(CompiledExpr::scalar(format!("CHAR_LENGTH({})", arg_sql(0)?))),
        Function::UCase => Ok(CompiledExpr::scalar(format!("UPPER({})", arg_sql(0)?))),
        Function::LCase => Ok(CompiledExpr::scalar(format!("LOWER({})", arg_sql(0)?))),
        Function::SubStr => {
            let value = arg_sql(0)?;
            let start = arg_sql(1)?;
            match arg_sql(2) {
                Ok(length) => Ok(CompiledExpr::scalar(format!("SUBSTRING({value} FROM {start} FOR {length})"))),
                Err(_) => Ok(CompiledExpr::scalar(format!("SUBSTRING({value} FROM {start})"))),
            }
        }
        Function::Replace => {
            let value = arg_sql(0)?;
            let pattern = arg_sql(1)?;
            let replacement = arg_sql(2)?;
            Ok(CompiledExpr::scalar(format!(
                "REGEXP_REPLACE({value}, {pattern}, {replacement})"
            )))
        }
        Function::Contains => Ok(CompiledExpr::boolean(format!(
            "POSITION({} IN {}) > 0",
            arg_sql(1)?,
            arg_sql(0)?
        ))),
        Function::StrStarts => Ok(CompiledExpr::boolean(format!("({} LIKE {} || '%')", arg_sql(0)?, arg_sql(1)?))),
        Function::StrEnds => Ok(CompiledExpr::boolean(format!("({} LIKE '%' || {})", arg_sql(0)?, arg_sql(1)?))),
        Function::Regex => {
            let value = arg_sql(0)?;
            let pattern = arg_sql(1)?;
            let flags = args
                .get(2)
                .map(|expr| compile_expression(ctx, bindings, expr).map(|c| c.sql))
                .transpose()?;
            let operator = match flags.as_deref() {
                Some(f) if f.contains('i') => "~*",
                _ => "~",
            };
            Ok(CompiledExpr::boolean(format!("({value} {operator} {pattern})")))
        }
        Function::Md5 => Ok(CompiledExpr::scalar(format!("MD5({})", arg_sql(0)?))),
        Function::Sha1 => Ok(CompiledExpr::scalar(hash_expr("sha1", &arg_sql(0)?))),
        Function::Sha256 => Ok(CompiledExpr::scalar(hash_expr("sha256", &arg_sql(0)?))),
        Function::Sha384 => Ok(CompiledExpr::scalar(hash_expr("sha384", &arg_sql(0)?))),
        Function::Sha512 => Ok(CompiledExpr::scalar(hash_expr("sha512", &arg_sql(0)?))),
        Function::Year => Ok(CompiledExpr::scalar(date_part("year", &arg_sql(0)?))),
        Function::Month => Ok(CompiledExpr::scalar(date_part("month", &arg_sql(0)?))),
        Function::Day => Ok(CompiledExpr::scalar(date_part("day", &arg_sql(0)?))),
        Function::Hours => Ok(CompiledExpr::scalar(date_part("hour", &arg_sql(0)?))),
        Function::Minutes => Ok(CompiledExpr::scalar(date_part("minute", &arg_sql(0)?))),
        Function::Seconds => Ok(CompiledExpr::scalar(date_part("second", &arg_sql(0)?))),
        Function::Timezone | Function::Tz => {
            Ok(CompiledExpr::scalar(format!("CAST({} AS time zone)", arg_sql(0)?)))
        }
        Function::Custom(iri) => compile_cast(iri, &arg_sql(0)?),
        other => Err(RelquadError::unsupported_feature(format!("function {other:?}"))),
    }
}

fn variable_arg_column(
    ctx: &TranslationContext<'_>,
    bindings: &BTreeMap<Variable, VariableColumn>,
    args: &[Expression],
    index: usize,
    column: &str,
) -> RelquadResult<String> {
    let Expression::Variable(var) = args.get(index).ok_or_else(|| RelquadError::Type("missing argument".to_owned()))? else {
        return Err(RelquadError::unsupported_feature("LANG/DATATYPE require a direct variable argument"));
    };
    let binding = lookup(bindings, var)?;
    Ok(variable_column_expr(ctx, binding, column))
}

fn hash_expr(algorithm: &str, value: &str) -> String {
    format!("ENCODE(DIGEST({value}, '{algorithm}'), 'hex')")
}

fn date_part(part: &str, value: &str) -> String {
    format!("EXTRACT({part} FROM CAST({value} AS TIMESTAMP))")
}

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

fn compile_cast(datatype: &NamedNode, value: &str) -> RelquadResult<CompiledExpr> {
    let suffix = datatype.as_str().strip_prefix(XSD);
    let sql = match suffix {
        Some("integer") => format!("CAST({value} AS BIGINT)"),
        Some("decimal") => format!("CAST({value} AS NUMERIC)"),
        Some("double" | "float") => format!("CAST({value} AS DOUBLE PRECISION)"),
        Some("boolean") => format!("CAST({value} AS BOOLEAN)"),
        Some("dateTime") => format!("CAST({value} AS TIMESTAMP)"),
        Some("string") => value.to_owned(),
        _ => {
            return Err(RelquadError::unsupported_feature(format!(
                "cast to {}",
                datatype.as_str()
            )))
        }
    };
    Ok(CompiledExpr::scalar(sql))
}

/// Renders an `IN`-list of literal SQL text for hardcoded option sets
/// (used by `NegatedSet` path translation).
#[must_use]
pub fn quote_literal_list(values: &[String]) -> String {
    values.iter().map(|v| quote_literal(v)).join(", ")
}
