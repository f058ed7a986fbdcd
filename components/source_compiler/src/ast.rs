//! Syntax tree node definitions for the embedding subset

/// A parsed program: top-level statements in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Program body
    pub body: Vec<Statement>,
}

/// Statements of the subset.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Variable declaration
    VariableDeclaration {
        /// List of declarators
        declarations: Vec<VariableDeclarator>,
    },

    /// Expression statement
    ExpressionStatement {
        /// The expression
        expression: Expression,
    },

    /// If statement
    IfStatement {
        /// Condition
        test: Expression,
        /// Consequent branch
        consequent: Box<Statement>,
        /// Alternate branch
        alternate: Option<Box<Statement>>,
    },

    /// While loop
    WhileStatement {
        /// Loop condition
        test: Expression,
        /// Loop body
        body: Box<Statement>,
    },

    /// For...of loop
    ForOfStatement {
        /// Loop variable name
        binding: String,
        /// Iterable to iterate over
        right: Expression,
        /// Loop body
        body: Box<Statement>,
    },

    /// Block statement
    BlockStatement {
        /// Block body
        body: Vec<Statement>,
    },

    /// Throw statement
    ThrowStatement {
        /// Exception to throw
        argument: Expression,
    },

    /// Empty statement
    EmptyStatement,
}

/// A single `name` or `name = init` inside a variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// Variable name
    pub name: String,
    /// Initializer
    pub init: Option<Expression>,
}

/// Expressions of the subset.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Identifier reference
    Identifier {
        /// Variable name
        name: String,
    },

    /// Literal value
    Literal {
        /// Literal value
        value: Literal,
    },

    /// Array literal
    ArrayExpression {
        /// Elements
        elements: Vec<Expression>,
    },

    /// Binary operation
    BinaryExpression {
        /// Left operand
        left: Box<Expression>,
        /// Operator
        operator: BinaryOperator,
        /// Right operand
        right: Box<Expression>,
    },

    /// Unary operation
    UnaryExpression {
        /// Operator
        operator: UnaryOperator,
        /// Operand
        argument: Box<Expression>,
    },

    /// Assignment expression
    AssignmentExpression {
        /// Left-hand side; an identifier or member expression
        target: Box<Expression>,
        /// Right-hand side
        value: Box<Expression>,
    },

    /// Member access (obj.prop or obj[prop])
    MemberExpression {
        /// Object
        object: Box<Expression>,
        /// Property
        property: Box<Expression>,
        /// Is computed (bracket notation)
        computed: bool,
    },

    /// Function call
    CallExpression {
        /// Function being called
        callee: Box<Expression>,
        /// Arguments
        arguments: Vec<Expression>,
    },
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Number literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// null literal
    Null,
    /// undefined literal
    Undefined,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
    /// Modulo
    Mod,
    /// Equality
    Eq,
    /// Inequality
    NotEq,
    /// Strict equality
    StrictEq,
    /// Strict inequality
    StrictNotEq,
    /// Less than
    Lt,
    /// Less than or equal
    LtEq,
    /// Greater than
    Gt,
    /// Greater than or equal
    GtEq,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// Numeric negation
    Minus,
    /// Logical NOT
    Not,
}
