use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, digit1, hex_digit1, multispace0},
    combinator::{map, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult,
};

use super::{ExprError, Span, Token, WithSpan};

fn lex_operator(inp: Span) -> IResult<Span, Token> {
    alt((
        // two-character operators must win over their one-character prefixes
        alt((
            value(Token::Eq, tag("==")),
            value(Token::Neq, tag("!=")),
            value(Token::And, tag("&&")),
            value(Token::Or, tag("||")),
        )),
        alt((
            value(Token::Plus, tag("+")),
            value(Token::Minus, tag("-")),
            value(Token::Star, tag("*")),
            value(Token::Slash, tag("/")),
            value(Token::LParen, tag("(")),
            value(Token::RParen, tag(")")),
            value(Token::Not, tag("!")),
        )),
    ))(inp)
}

fn lex_number(inp: Span) -> IResult<Span, Token> {
    alt((
        map(
            preceded(alt((tag("0x"), tag("0X"))), hex_digit1),
            |s: Span| Token::Hex(*s.fragment()),
        ),
        map(digit1, |s: Span| Token::Dec(*s.fragment())),
    ))(inp)
}

fn lex_identifier(inp: Span) -> IResult<Span, Span> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(inp)
}

fn lex_register(inp: Span) -> IResult<Span, Token> {
    alt((
        map(preceded(tag("$"), alphanumeric1), |s: Span| {
            Token::Register(*s.fragment())
        }),
        map(lex_identifier, |s: Span| Token::Ident(*s.fragment())),
    ))(inp)
}

impl<'a> Token<'a> {
    pub fn lex(inp: Span<'a>) -> IResult<Span<'a>, WithSpan<Self>> {
        let offset = inp.location_offset();
        map(alt((lex_operator, lex_number, lex_register)), move |item| {
            WithSpan { offset, item }
        })(inp)
    }
}

/// Lexes expression text into a [Vec] of [Token]s.
pub fn lex_expr(text: &str) -> Result<Vec<WithSpan<Token<'_>>>, ExprError> {
    let span = Span::new(text);
    let (garbage, toks) = many0(delimited(multispace0, Token::lex, multispace0))(span)
        .map_err(|e| {
            let position = match e {
                nom::Err::Error(e) | nom::Err::Failure(e) => e.input.location_offset(),
                nom::Err::Incomplete(_) => 0,
            };
            ExprError::NoMatch { position }
        })?;
    if garbage.fragment().trim().is_empty() {
        Ok(toks)
    } else {
        let skipped = garbage.fragment().len() - garbage.fragment().trim_start().len();
        Err(ExprError::NoMatch {
            position: garbage.location_offset() + skipped,
        })
    }
}
