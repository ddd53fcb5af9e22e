/// Resolved static type attached to expression nodes by the checker.
///
/// The backend trusts these annotations; it never infers. Separate from
/// the AST so codegen can reason about types without caring about syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    // -- Primitives --
    Int,
    Float,
    Str,
    Bool,

    /// A regular expression pattern.
    Pattern,

    /// Statements and blocks, which yield no value.
    None,

    /// Dimensioned (indexed) metric type: one argument per label key,
    /// then the stored value type last.
    Dimension(Vec<Type>),

    /// Unresolved inference variable left behind by the checker.
    Var(usize),
}

impl Type {
    /// Whether this is a dimensioned metric type.
    pub fn is_dimension(&self) -> bool {
        matches!(self, Type::Dimension(_))
    }

    /// The innermost argument of a dimensioned type: the type of the
    /// stored value. For any other type, the type itself.
    pub fn innermost(&self) -> &Type {
        match self {
            Type::Dimension(args) => args.last().unwrap_or(self),
            other => other,
        }
    }

    /// Whether the type is fully resolved (contains no inference
    /// variables).
    pub fn is_complete(&self) -> bool {
        match self {
            Type::Var(_) => false,
            Type::Dimension(args) => args.iter().all(Type::is_complete),
            _ => true,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "Int"),
            Type::Float => write!(f, "Float"),
            Type::Str => write!(f, "String"),
            Type::Bool => write!(f, "Bool"),
            Type::Pattern => write!(f, "Pattern"),
            Type::None => write!(f, "None"),
            Type::Dimension(args) => {
                let inner: Vec<String> = args.iter().map(|t| t.to_string()).collect();
                write!(f, "Dimension<{}>", inner.join(", "))
            }
            Type::Var(n) => write!(f, "?{}", n),
        }
    }
}
