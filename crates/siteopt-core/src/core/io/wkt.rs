use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum WktError {
    #[error("WKT text is empty")]
    EmptyInput,
    #[error("Invalid SRID prefix in '{0}'")]
    InvalidSrid(String),
    #[error("Unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("Invalid number '{0}'")]
    InvalidNumber(String),
    #[error("Unsupported geometry type '{0}', expected POINT or POLYGON")]
    UnsupportedGeometry(String),
    #[error("Geometry '{0}' is EMPTY")]
    EmptyGeometry(String),
    #[error("Malformed WKT: expected {expected}")]
    Malformed { expected: &'static str },
    #[error("Expected a {expected} but found a {found}")]
    WrongGeometry {
        expected: &'static str,
        found: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum WktGeometry {
    Point { x: f64, y: f64 },
    /// Exterior ring first, then holes.
    Polygon { rings: Vec<Vec<(f64, f64)>> },
}

impl WktGeometry {
    fn kind(&self) -> &'static str {
        match self {
            WktGeometry::Point { .. } => "POINT",
            WktGeometry::Polygon { .. } => "POLYGON",
        }
    }
}

/// A parsed geometry with the SRID of an optional EWKT `SRID=n;` prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct Wkt {
    pub srid: Option<u32>,
    pub geometry: WktGeometry,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Number(f64),
    LParen,
    RParen,
    Comma,
}

pub fn parse(text: &str) -> Result<Wkt, WktError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(WktError::EmptyInput);
    }

    let (srid, body) = split_srid(trimmed)?;
    let tokens = tokenize(body)?;
    let mut parser = Parser { tokens, pos: 0 };
    let geometry = parser.geometry()?;
    if parser.pos != parser.tokens.len() {
        return Err(WktError::Malformed {
            expected: "end of input",
        });
    }
    Ok(Wkt { srid, geometry })
}

/// Parses `POINT(x y)`, returning the coordinates and optional SRID.
pub fn parse_point(text: &str) -> Result<(f64, f64, Option<u32>), WktError> {
    let wkt = parse(text)?;
    match wkt.geometry {
        WktGeometry::Point { x, y } => Ok((x, y, wkt.srid)),
        other => Err(WktError::WrongGeometry {
            expected: "POINT",
            found: other.kind(),
        }),
    }
}

/// Parses `POLYGON((...), (...))`, returning its rings and optional SRID.
pub fn parse_polygon(text: &str) -> Result<(Vec<Vec<(f64, f64)>>, Option<u32>), WktError> {
    let wkt = parse(text)?;
    match wkt.geometry {
        WktGeometry::Polygon { rings } => Ok((rings, wkt.srid)),
        other => Err(WktError::WrongGeometry {
            expected: "POLYGON",
            found: other.kind(),
        }),
    }
}

pub fn format_point(x: f64, y: f64) -> String {
    format!("POINT({} {})", x, y)
}

fn split_srid(text: &str) -> Result<(Option<u32>, &str), WktError> {
    let Some(rest) = text
        .get(..5)
        .filter(|p| p.eq_ignore_ascii_case("SRID="))
        .map(|_| &text[5..])
    else {
        return Ok((None, text));
    };
    let (code, body) = rest
        .split_once(';')
        .ok_or_else(|| WktError::InvalidSrid(text.to_string()))?;
    let srid = code
        .trim()
        .parse::<u32>()
        .map_err(|_| WktError::InvalidSrid(text.to_string()))?;
    Ok((Some(srid), body.trim()))
}

fn tokenize(text: &str) -> Result<Vec<Token>, WktError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            ',' => {
                tokens.push(Token::Comma);
                chars.next();
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !c.is_ascii_alphabetic() {
                        break;
                    }
                    word.push(c.to_ascii_uppercase());
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let mut literal = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')) {
                        break;
                    }
                    literal.push(c);
                    chars.next();
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| WktError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            _ => return Err(WktError::UnexpectedChar { ch, offset }),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn expect(&mut self, expected: Token, description: &'static str) -> Result<(), WktError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            _ => Err(WktError::Malformed {
                expected: description,
            }),
        }
    }

    fn geometry(&mut self) -> Result<WktGeometry, WktError> {
        let keyword = match self.next() {
            Some(Token::Word(word)) => word,
            _ => {
                return Err(WktError::Malformed {
                    expected: "geometry keyword",
                });
            }
        };
        if matches!(self.peek(), Some(Token::Word(w)) if w == "EMPTY") {
            return Err(WktError::EmptyGeometry(keyword));
        }
        match keyword.as_str() {
            "POINT" => {
                self.expect(Token::LParen, "'(' after POINT")?;
                let (x, y) = self.coordinate()?;
                self.expect(Token::RParen, "')' closing POINT")?;
                Ok(WktGeometry::Point { x, y })
            }
            "POLYGON" => {
                self.expect(Token::LParen, "'(' after POLYGON")?;
                let mut rings = vec![self.ring()?];
                while matches!(self.peek(), Some(Token::Comma)) {
                    self.next();
                    rings.push(self.ring()?);
                }
                self.expect(Token::RParen, "')' closing POLYGON")?;
                Ok(WktGeometry::Polygon { rings })
            }
            _ => Err(WktError::UnsupportedGeometry(keyword)),
        }
    }

    fn ring(&mut self) -> Result<Vec<(f64, f64)>, WktError> {
        self.expect(Token::LParen, "'(' opening a ring")?;
        let mut coords = vec![self.coordinate()?];
        while matches!(self.peek(), Some(Token::Comma)) {
            self.next();
            coords.push(self.coordinate()?);
        }
        self.expect(Token::RParen, "')' closing a ring")?;
        Ok(coords)
    }

    fn coordinate(&mut self) -> Result<(f64, f64), WktError> {
        let x = self.number()?;
        let y = self.number()?;
        Ok((x, y))
    }

    fn number(&mut self) -> Result<f64, WktError> {
        match self.next() {
            Some(Token::Number(value)) => Ok(value),
            _ => Err(WktError::Malformed {
                expected: "a coordinate value",
            }),
        }
    }
}
