//! Recursive descent parser for the embedding subset
//!
//! One precedence level per method, lowest binding at the top:
//! assignment, equality, relational, additive, multiplicative, unary,
//! then call/member postfix chains over primaries. Statements terminate
//! at a semicolon, a line break, a closing brace, or end of input.

use value_model::EngineResult;

use crate::ast::{
    BinaryOperator, Expression, Literal, Program, Statement, UnaryOperator, VariableDeclarator,
};
use crate::error::{syntax_error, unexpected_token};
use crate::lexer::{Keyword, Lexer, Punctuator, Token};

/// Parser over subset source code.
pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    /// Creates a parser for the given source code.
    pub fn new(source: &str) -> Self {
        Parser { lexer: Lexer::new(source) }
    }

    /// Parses a complete program.
    pub fn parse(&mut self) -> EngineResult<Program> {
        let mut body = Vec::new();
        while !matches!(self.lexer.peek_token()?, Token::Eof) {
            body.push(self.parse_statement()?);
        }
        Ok(Program { body })
    }

    fn parse_statement(&mut self) -> EngineResult<Statement> {
        match self.lexer.peek_token()? {
            Token::Keyword(Keyword::Var) => self.parse_variable_declaration(),
            Token::Keyword(Keyword::If) => self.parse_if_statement(),
            Token::Keyword(Keyword::While) => self.parse_while_statement(),
            Token::Keyword(Keyword::For) => self.parse_for_of_statement(),
            Token::Keyword(Keyword::Throw) => self.parse_throw_statement(),
            Token::Punctuator(Punctuator::LBrace) => self.parse_block_statement(),
            Token::Punctuator(Punctuator::Semicolon) => {
                self.lexer.next_token()?;
                Ok(Statement::EmptyStatement)
            }
            _ => {
                let expression = self.parse_expression()?;
                self.expect_statement_end()?;
                Ok(Statement::ExpressionStatement { expression })
            }
        }
    }

    fn parse_variable_declaration(&mut self) -> EngineResult<Statement> {
        self.lexer.next_token()?;
        let mut declarations = Vec::new();
        loop {
            let name = self.expect_identifier("a variable name")?;
            let init = if self.eat_punctuator(Punctuator::Assign)? {
                Some(self.parse_assignment_expression()?)
            } else {
                None
            };
            declarations.push(VariableDeclarator { name, init });
            if !self.eat_punctuator(Punctuator::Comma)? {
                break;
            }
        }
        self.expect_statement_end()?;
        Ok(Statement::VariableDeclaration { declarations })
    }

    fn parse_if_statement(&mut self) -> EngineResult<Statement> {
        self.lexer.next_token()?;
        self.expect_punctuator(Punctuator::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punctuator(Punctuator::RParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat_keyword(Keyword::Else)? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::IfStatement { test, consequent, alternate })
    }

    fn parse_while_statement(&mut self) -> EngineResult<Statement> {
        self.lexer.next_token()?;
        self.expect_punctuator(Punctuator::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punctuator(Punctuator::RParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::WhileStatement { test, body })
    }

    fn parse_for_of_statement(&mut self) -> EngineResult<Statement> {
        self.lexer.next_token()?;
        self.expect_punctuator(Punctuator::LParen)?;
        self.eat_keyword(Keyword::Var)?;
        let binding = self.expect_identifier("a loop variable")?;

        // `of` is contextual; any other continuation is not a loop form
        // this subset supports.
        let position = self.lexer.token_position()?;
        match self.lexer.next_token()? {
            Token::Identifier(word) if word == "of" => {}
            token => return Err(unexpected_token("'of'", &token, position)),
        }

        let right = self.parse_expression()?;
        self.expect_punctuator(Punctuator::RParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::ForOfStatement { binding, right, body })
    }

    fn parse_throw_statement(&mut self) -> EngineResult<Statement> {
        self.lexer.next_token()?;
        if self.lexer.newline_before_token()? {
            let position = self.lexer.token_position()?;
            return Err(syntax_error("Illegal newline after throw", position));
        }
        let argument = self.parse_expression()?;
        self.expect_statement_end()?;
        Ok(Statement::ThrowStatement { argument })
    }

    fn parse_block_statement(&mut self) -> EngineResult<Statement> {
        self.lexer.next_token()?;
        let mut body = Vec::new();
        while !matches!(
            self.lexer.peek_token()?,
            Token::Punctuator(Punctuator::RBrace) | Token::Eof
        ) {
            body.push(self.parse_statement()?);
        }
        self.expect_punctuator(Punctuator::RBrace)?;
        Ok(Statement::BlockStatement { body })
    }

    fn parse_expression(&mut self) -> EngineResult<Expression> {
        self.parse_assignment_expression()
    }

    fn parse_assignment_expression(&mut self) -> EngineResult<Expression> {
        let position = self.lexer.token_position()?;
        let expression = self.parse_equality_expression()?;
        if self.eat_punctuator(Punctuator::Assign)? {
            if !is_assignment_target(&expression) {
                return Err(syntax_error("Invalid assignment target", position));
            }
            let value = self.parse_assignment_expression()?;
            return Ok(Expression::AssignmentExpression {
                target: Box::new(expression),
                value: Box::new(value),
            });
        }
        Ok(expression)
    }

    fn parse_equality_expression(&mut self) -> EngineResult<Expression> {
        let mut left = self.parse_relational_expression()?;
        loop {
            let operator = match self.lexer.peek_token()? {
                Token::Punctuator(Punctuator::EqEq) => BinaryOperator::Eq,
                Token::Punctuator(Punctuator::NotEq) => BinaryOperator::NotEq,
                Token::Punctuator(Punctuator::EqEqEq) => BinaryOperator::StrictEq,
                Token::Punctuator(Punctuator::NotEqEq) => BinaryOperator::StrictNotEq,
                _ => break,
            };
            self.lexer.next_token()?;
            let right = self.parse_relational_expression()?;
            left = Expression::BinaryExpression {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_relational_expression(&mut self) -> EngineResult<Expression> {
        let mut left = self.parse_additive_expression()?;
        loop {
            let operator = match self.lexer.peek_token()? {
                Token::Punctuator(Punctuator::Lt) => BinaryOperator::Lt,
                Token::Punctuator(Punctuator::LtEq) => BinaryOperator::LtEq,
                Token::Punctuator(Punctuator::Gt) => BinaryOperator::Gt,
                Token::Punctuator(Punctuator::GtEq) => BinaryOperator::GtEq,
                _ => break,
            };
            self.lexer.next_token()?;
            let right = self.parse_additive_expression()?;
            left = Expression::BinaryExpression {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive_expression(&mut self) -> EngineResult<Expression> {
        let mut left = self.parse_multiplicative_expression()?;
        loop {
            let operator = match self.lexer.peek_token()? {
                Token::Punctuator(Punctuator::Plus) => BinaryOperator::Add,
                Token::Punctuator(Punctuator::Minus) => BinaryOperator::Sub,
                _ => break,
            };
            self.lexer.next_token()?;
            let right = self.parse_multiplicative_expression()?;
            left = Expression::BinaryExpression {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> EngineResult<Expression> {
        let mut left = self.parse_unary_expression()?;
        loop {
            let operator = match self.lexer.peek_token()? {
                Token::Punctuator(Punctuator::Star) => BinaryOperator::Mul,
                Token::Punctuator(Punctuator::Slash) => BinaryOperator::Div,
                Token::Punctuator(Punctuator::Percent) => BinaryOperator::Mod,
                _ => break,
            };
            self.lexer.next_token()?;
            let right = self.parse_unary_expression()?;
            left = Expression::BinaryExpression {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> EngineResult<Expression> {
        if self.eat_punctuator(Punctuator::Minus)? {
            let argument = self.parse_unary_expression()?;
            return Ok(Expression::UnaryExpression {
                operator: UnaryOperator::Minus,
                argument: Box::new(argument),
            });
        }
        if self.eat_punctuator(Punctuator::Not)? {
            let argument = self.parse_unary_expression()?;
            return Ok(Expression::UnaryExpression {
                operator: UnaryOperator::Not,
                argument: Box::new(argument),
            });
        }
        self.parse_call_expression()
    }

    fn parse_call_expression(&mut self) -> EngineResult<Expression> {
        let mut expression = self.parse_primary_expression()?;
        loop {
            if self.eat_punctuator(Punctuator::Dot)? {
                let name = self.expect_identifier("a property name")?;
                expression = Expression::MemberExpression {
                    object: Box::new(expression),
                    property: Box::new(Expression::Identifier { name }),
                    computed: false,
                };
            } else if self.eat_punctuator(Punctuator::LBracket)? {
                let index = self.parse_expression()?;
                self.expect_punctuator(Punctuator::RBracket)?;
                expression = Expression::MemberExpression {
                    object: Box::new(expression),
                    property: Box::new(index),
                    computed: true,
                };
            } else if self.eat_punctuator(Punctuator::LParen)? {
                let mut arguments = Vec::new();
                if !self.check_punctuator(Punctuator::RParen)? {
                    loop {
                        arguments.push(self.parse_assignment_expression()?);
                        if !self.eat_punctuator(Punctuator::Comma)? {
                            break;
                        }
                    }
                }
                self.expect_punctuator(Punctuator::RParen)?;
                expression = Expression::CallExpression {
                    callee: Box::new(expression),
                    arguments,
                };
            } else {
                break;
            }
        }
        Ok(expression)
    }

    fn parse_primary_expression(&mut self) -> EngineResult<Expression> {
        let position = self.lexer.token_position()?;
        match self.lexer.next_token()? {
            Token::Number(value) => Ok(Expression::Literal { value: Literal::Number(value) }),
            Token::String(value) => Ok(Expression::Literal { value: Literal::String(value) }),
            Token::Keyword(Keyword::True) => {
                Ok(Expression::Literal { value: Literal::Boolean(true) })
            }
            Token::Keyword(Keyword::False) => {
                Ok(Expression::Literal { value: Literal::Boolean(false) })
            }
            Token::Keyword(Keyword::Null) => Ok(Expression::Literal { value: Literal::Null }),
            Token::Identifier(name) if name == "undefined" => {
                Ok(Expression::Literal { value: Literal::Undefined })
            }
            Token::Identifier(name) => Ok(Expression::Identifier { name }),
            Token::Punctuator(Punctuator::LParen) => {
                let expression = self.parse_expression()?;
                self.expect_punctuator(Punctuator::RParen)?;
                Ok(expression)
            }
            Token::Punctuator(Punctuator::LBracket) => {
                let mut elements = Vec::new();
                if !self.check_punctuator(Punctuator::RBracket)? {
                    loop {
                        elements.push(self.parse_assignment_expression()?);
                        if !self.eat_punctuator(Punctuator::Comma)? {
                            break;
                        }
                        // Trailing comma before the closing bracket.
                        if self.check_punctuator(Punctuator::RBracket)? {
                            break;
                        }
                    }
                }
                self.expect_punctuator(Punctuator::RBracket)?;
                Ok(Expression::ArrayExpression { elements })
            }
            token => Err(unexpected_token("an expression", &token, position)),
        }
    }

    // ==================================================================
    // Token helpers
    // ==================================================================

    fn check_punctuator(&mut self, punctuator: Punctuator) -> EngineResult<bool> {
        Ok(matches!(
            self.lexer.peek_token()?,
            Token::Punctuator(found) if *found == punctuator
        ))
    }

    fn eat_punctuator(&mut self, punctuator: Punctuator) -> EngineResult<bool> {
        if self.check_punctuator(punctuator)? {
            self.lexer.next_token()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect_punctuator(&mut self, punctuator: Punctuator) -> EngineResult<()> {
        let position = self.lexer.token_position()?;
        match self.lexer.next_token()? {
            Token::Punctuator(found) if found == punctuator => Ok(()),
            token => Err(unexpected_token(
                &Token::Punctuator(punctuator).to_string(),
                &token,
                position,
            )),
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> EngineResult<bool> {
        let found = matches!(
            self.lexer.peek_token()?,
            Token::Keyword(k) if *k == keyword
        );
        if found {
            self.lexer.next_token()?;
        }
        Ok(found)
    }

    fn expect_identifier(&mut self, expected: &str) -> EngineResult<String> {
        let position = self.lexer.token_position()?;
        match self.lexer.next_token()? {
            Token::Identifier(name) => Ok(name),
            token => Err(unexpected_token(expected, &token, position)),
        }
    }

    /// A statement ends at `;`, a line break, `}`, or end of input.
    fn expect_statement_end(&mut self) -> EngineResult<()> {
        if self.eat_punctuator(Punctuator::Semicolon)? {
            return Ok(());
        }
        if matches!(
            self.lexer.peek_token()?,
            Token::Eof | Token::Punctuator(Punctuator::RBrace)
        ) || self.lexer.newline_before_token()?
        {
            return Ok(());
        }
        let position = self.lexer.token_position()?;
        let token = self.lexer.peek_token()?;
        Err(unexpected_token("';'", token, position))
    }
}

fn is_assignment_target(expression: &Expression) -> bool {
    matches!(
        expression,
        Expression::Identifier { .. } | Expression::MemberExpression { .. }
    )
}
