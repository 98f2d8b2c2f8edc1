//! Part 21 parser: builds a raw entity graph from tokens.
//!
//! The parser does not interpret entity semantics. Each instance keeps its
//! ID, type name and argument tree. Complex instances
//! (`#7 = ( A(..) B(..) );`) are stored under the type name `COMPLEX` with
//! one [`StepValue::Typed`] argument per partial type.

use crate::error::StepError;
use crate::lexer::{Lexer, SpannedToken, Token};
use std::collections::BTreeMap;

/// Type name recorded for complex (multi-type) entity instances.
pub const COMPLEX_TYPE: &str = "COMPLEX";

/// Deepest parenthesised nesting accepted inside one instance.
const MAX_NESTING: usize = 256;

/// A single argument value in a STEP entity.
#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    /// Entity reference (e.g., `#123`).
    EntityRef(u64),
    /// String literal.
    String(String),
    /// Real number.
    Real(f64),
    /// Integer number.
    Integer(i64),
    /// Enumeration (e.g., `.T.`).
    Enum(String),
    /// List of values (nested in parentheses).
    List(Vec<StepValue>),
    /// Derived value (`*`).
    Derived,
    /// Unset value (`$`).
    Null,
    /// Typed value `TYPE_NAME(args)`, inline or as a complex-instance part.
    Typed {
        /// The type name.
        type_name: String,
        /// Arguments.
        args: Vec<StepValue>,
    },
}

impl StepValue {
    /// Entity reference, if this is one.
    pub fn as_entity_ref(&self) -> Option<u64> {
        match self {
            StepValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Real number; integers are widened.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            StepValue::Real(v) => Some(*v),
            StepValue::Integer(v) => Some(*v as f64),
            // Some exporters wrap measures, e.g. POSITIVE_LENGTH_MEASURE(2.5)
            StepValue::Typed { args, .. } if args.len() == 1 => args[0].as_real(),
            _ => None,
        }
    }

    /// String literal, if this is one.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            StepValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Enumeration name, if this is one.
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            StepValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret a `.T.` / `.F.` enumeration as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_enum()? {
            "T" | "TRUE" => Some(true),
            "F" | "FALSE" => Some(false),
            _ => None,
        }
    }

    /// List contents, if this is a list.
    pub fn as_list(&self) -> Option<&[StepValue]> {
        match self {
            StepValue::List(v) => Some(v),
            _ => None,
        }
    }

    /// Visit every entity reference in this value, depth first.
    pub fn for_each_ref(&self, f: &mut impl FnMut(u64)) {
        match self {
            StepValue::EntityRef(id) => f(*id),
            StepValue::List(items) | StepValue::Typed { args: items, .. } => {
                for item in items {
                    item.for_each_ref(f);
                }
            }
            _ => {}
        }
    }
}

/// A parsed STEP entity instance.
#[derive(Debug, Clone)]
pub struct StepEntity {
    /// Entity ID (from `#123`). Header entities use 0.
    pub id: u64,
    /// Entity type name (e.g., `CARTESIAN_POINT`), or [`COMPLEX_TYPE`].
    pub type_name: String,
    /// Arguments to the entity constructor.
    pub args: Vec<StepValue>,
}

impl StepEntity {
    /// Whether this instance is of `type_name`, either directly or as one
    /// part of a complex instance.
    pub fn is_a(&self, type_name: &str) -> bool {
        self.type_name == type_name || self.part(type_name).is_some()
    }

    /// Arguments of the named part of a complex instance.
    pub fn part(&self, type_name: &str) -> Option<&[StepValue]> {
        if self.type_name != COMPLEX_TYPE {
            return None;
        }
        self.args.iter().find_map(|arg| match arg {
            StepValue::Typed { type_name: t, args } if t == type_name => Some(args.as_slice()),
            _ => None,
        })
    }
}

/// The complete parsed content of a STEP file.
#[derive(Debug, Clone)]
pub struct StepFile {
    /// Header section entities (`FILE_DESCRIPTION`, `FILE_NAME`, `FILE_SCHEMA`).
    pub header: Vec<StepEntity>,
    /// Data section entities, ordered by ID.
    pub entities: BTreeMap<u64, StepEntity>,
}

impl StepFile {
    /// Get an entity by ID.
    pub fn get(&self, id: u64) -> Option<&StepEntity> {
        self.entities.get(&id)
    }

    /// Get an entity by ID, returning an error if not found.
    pub fn require(&self, id: u64) -> Result<&StepEntity, StepError> {
        self.entities.get(&id).ok_or(StepError::MissingEntity(id))
    }

    /// Get an entity by ID and check its type.
    pub fn require_type(&self, id: u64, type_name: &str) -> Result<&StepEntity, StepError> {
        let entity = self.require(id)?;
        if entity.is_a(type_name) {
            Ok(entity)
        } else {
            Err(StepError::type_mismatch(type_name, &entity.type_name))
        }
    }

    /// All entities of a given type, in ascending ID order.
    pub fn entities_of_type<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = &'a StepEntity> + 'a {
        self.entities.values().filter(move |e| e.type_name == type_name)
    }

    /// Schema names from the `FILE_SCHEMA` header entity.
    pub fn schemas(&self) -> Vec<&str> {
        self.header
            .iter()
            .filter(|e| e.type_name == "FILE_SCHEMA")
            .filter_map(|e| e.args.first()?.as_list())
            .flat_map(|list| list.iter().filter_map(StepValue::as_string))
            .collect()
    }
}

/// Parser for Part 21 STEP files.
pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    current_entity: Option<u64>,
    depth: usize,
}

impl Parser {
    /// Parse a STEP file from bytes.
    pub fn parse(input: &[u8]) -> Result<StepFile, StepError> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            current_entity: None,
            depth: 0,
        };
        parser.parse_file()
    }

    fn parse_file(&mut self) -> Result<StepFile, StepError> {
        let mut header = Vec::new();
        let mut entities = BTreeMap::new();

        self.expect_keyword("ISO-10303-21")?;
        self.expect_token(&Token::Semicolon)?;

        while !self.is_at_end() {
            if self.check_keyword("HEADER") {
                self.advance();
                self.expect_token(&Token::Semicolon)?;
                header = self.parse_header_section()?;
                self.expect_keyword("ENDSEC")?;
                self.expect_token(&Token::Semicolon)?;
            } else if self.check_keyword("DATA") {
                self.advance();
                // DATA may carry a parameter list in Part 21 edition 3.
                if self.check_token(&Token::LParen) {
                    self.parse_args()?;
                }
                self.expect_token(&Token::Semicolon)?;
                self.parse_data_section(&mut entities)?;
                self.expect_keyword("ENDSEC")?;
                self.expect_token(&Token::Semicolon)?;
            } else if self.check_keyword("END-ISO-10303-21") {
                self.advance();
                self.expect_token(&Token::Semicolon)?;
                break;
            } else {
                return Err(self.error_here("expected HEADER, DATA or END-ISO-10303-21"));
            }
        }

        Ok(StepFile { header, entities })
    }

    fn parse_header_section(&mut self) -> Result<Vec<StepEntity>, StepError> {
        let mut entities = Vec::new();
        while let Some(Token::Keyword(type_name)) = self.peek().map(|t| t.token.clone()) {
            if type_name == "ENDSEC" {
                break;
            }
            self.advance();
            let args = self.parse_args()?;
            self.expect_token(&Token::Semicolon)?;
            entities.push(StepEntity {
                id: 0,
                type_name,
                args,
            });
        }
        Ok(entities)
    }

    fn parse_data_section(
        &mut self,
        entities: &mut BTreeMap<u64, StepEntity>,
    ) -> Result<(), StepError> {
        while let Some(Token::EntityRef(id)) = self.peek().map(|t| t.token.clone()) {
            self.advance();
            self.current_entity = Some(id);
            self.expect_token(&Token::Equals)?;

            let (type_name, args) = match self.peek().map(|t| t.token.clone()) {
                Some(Token::Keyword(name)) => {
                    self.advance();
                    (name, self.parse_args()?)
                }
                Some(Token::LParen) => (COMPLEX_TYPE.to_string(), self.parse_complex_parts()?),
                _ => return Err(self.error_here("expected entity type name")),
            };
            self.expect_token(&Token::Semicolon)?;

            if entities
                .insert(id, StepEntity { id, type_name, args })
                .is_some()
            {
                return Err(StepError::parser(Some(id), "duplicate entity id"));
            }
        }
        self.current_entity = None;
        Ok(())
    }

    /// `( A(..) B(..) ... )` with no separators between the parts.
    fn parse_complex_parts(&mut self) -> Result<Vec<StepValue>, StepError> {
        self.expect_token(&Token::LParen)?;
        let mut parts = Vec::new();
        while let Some(Token::Keyword(type_name)) = self.peek().map(|t| t.token.clone()) {
            self.advance();
            let args = self.parse_args()?;
            parts.push(StepValue::Typed { type_name, args });
        }
        self.expect_token(&Token::RParen)?;
        if parts.is_empty() {
            return Err(self.error_here("empty complex instance"));
        }
        Ok(parts)
    }

    fn parse_args(&mut self) -> Result<Vec<StepValue>, StepError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_here(&format!("lists nested deeper than {MAX_NESTING}")));
        }
        self.depth += 1;
        let args = self.parse_arg_list();
        self.depth -= 1;
        args
    }

    fn parse_arg_list(&mut self) -> Result<Vec<StepValue>, StepError> {
        self.expect_token(&Token::LParen)?;
        let mut args = Vec::new();
        if !self.check_token(&Token::RParen) {
            args.push(self.parse_value()?);
            while self.check_token(&Token::Comma) {
                self.advance();
                args.push(self.parse_value()?);
            }
        }
        self.expect_token(&Token::RParen)?;
        Ok(args)
    }

    fn parse_value(&mut self) -> Result<StepValue, StepError> {
        let Some(tok) = self.peek().map(|t| t.token.clone()) else {
            return Err(self.error_here("unexpected end of input"));
        };
        let value = match tok {
            Token::EntityRef(id) => StepValue::EntityRef(id),
            Token::String(s) => StepValue::String(s),
            Token::Real(v) => StepValue::Real(v),
            Token::Integer(v) => StepValue::Integer(v),
            Token::Enum(s) => StepValue::Enum(s),
            Token::Asterisk => StepValue::Derived,
            Token::Dollar => StepValue::Null,
            Token::LParen => return Ok(StepValue::List(self.parse_args()?)),
            Token::Keyword(type_name) => {
                self.advance();
                let args = self.parse_args()?;
                return Ok(StepValue::Typed { type_name, args });
            }
            _ => return Err(self.error_here("unexpected token in argument list")),
        };
        self.advance();
        Ok(value)
    }

    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check_token(&self, expected: &Token) -> bool {
        self.peek().is_some_and(|t| &t.token == expected)
    }

    fn check_keyword(&self, name: &str) -> bool {
        matches!(self.peek(), Some(SpannedToken { token: Token::Keyword(k), .. }) if k == name)
    }

    fn expect_token(&mut self, expected: &Token) -> Result<(), StepError> {
        if self.check_token(expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(&format!("expected {expected:?}")))
        }
    }

    fn expect_keyword(&mut self, name: &str) -> Result<(), StepError> {
        if self.check_keyword(name) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(&format!("expected keyword '{name}'")))
        }
    }

    fn error_here(&self, message: &str) -> StepError {
        let detail = match self.peek() {
            Some(t) => format!(
                "{message}, got {:?} at line {}, column {}",
                t.token, t.pos.line, t.pos.col
            ),
            None => format!("{message}, got end of input"),
        };
        StepError::parser(self.current_entity, detail)
    }
}
