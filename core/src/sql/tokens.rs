/// SQL keywords, operators and punctuation emitted by the builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
pub enum Token {
    // Keywords
    SELECT,
    DISTINCT,
    FROM,
    WHERE,
    AND,
    OR,
    NOT,
    EXISTS,
    IN,
    BETWEEN,
    IS,
    NULL,
    LIKE,
    AS,
    ON,
    GROUP_BY,
    HAVING,
    ORDER_BY,
    ASC,
    DESC,
    LIMIT,
    OFFSET,
    INSERT_INTO,
    VALUES,
    UPDATE,
    SET,
    DELETE_FROM,

    // Punctuation
    STAR,
    COMMA,
    LPAREN,
    RPAREN,
    DOT,
    SEMI,

    // Comparison operators
    EQ,
    NE,
    LTGT,
    LT,
    GT,
    LE,
    GE,
}

impl Token {
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Token::SELECT => "SELECT",
            Token::DISTINCT => "DISTINCT",
            Token::FROM => "FROM",
            Token::WHERE => "WHERE",
            Token::AND => "AND",
            Token::OR => "OR",
            Token::NOT => "NOT",
            Token::EXISTS => "EXISTS",
            Token::IN => "IN",
            Token::BETWEEN => "BETWEEN",
            Token::IS => "IS",
            Token::NULL => "NULL",
            Token::LIKE => "LIKE",
            Token::AS => "AS",
            Token::ON => "ON",
            Token::GROUP_BY => "GROUP BY",
            Token::HAVING => "HAVING",
            Token::ORDER_BY => "ORDER BY",
            Token::ASC => "ASC",
            Token::DESC => "DESC",
            Token::LIMIT => "LIMIT",
            Token::OFFSET => "OFFSET",
            Token::INSERT_INTO => "INSERT INTO",
            Token::VALUES => "VALUES",
            Token::UPDATE => "UPDATE",
            Token::SET => "SET",
            Token::DELETE_FROM => "DELETE FROM",
            Token::STAR => "*",
            Token::COMMA => ",",
            Token::LPAREN => "(",
            Token::RPAREN => ")",
            Token::DOT => ".",
            Token::SEMI => ";",
            Token::EQ => "=",
            Token::NE => "!=",
            Token::LTGT => "<>",
            Token::LT => "<",
            Token::GT => ">",
            Token::LE => "<=",
            Token::GE => ">=",
        }
    }

    /// Comparison operators get a space on both sides.
    #[inline]
    pub const fn is_operator(&self) -> bool {
        matches!(
            self,
            Token::EQ | Token::NE | Token::LTGT | Token::LT | Token::GT | Token::LE | Token::GE
        )
    }

    /// Keywords and `*` behave like words for spacing purposes.
    #[inline]
    pub const fn is_word_like(&self) -> bool {
        !matches!(
            self,
            Token::COMMA | Token::LPAREN | Token::RPAREN | Token::DOT | Token::SEMI
        ) && !self.is_operator()
    }
}

impl core::fmt::Display for Token {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
