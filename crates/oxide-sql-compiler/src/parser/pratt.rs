//! Pratt binding powers for value and boolean operators.
//!
//! Predicates (`IS`, `IN`, `BETWEEN`, `LIKE`, `MATCH`, `OVERLAPS`) share the
//! comparison level and are handled by the expression parser itself.

use crate::ast::{BinaryOp, UnaryOp};
use crate::lexer::{Keyword, TokenKind};

/// Binding power of comparisons and predicates.
pub const COMPARISON_BP: u8 = 7;

/// Binding power used for the operand of a prefix `NOT`.
pub const NOT_BP: u8 = 5;

/// Binding power used for the operand of unary `-` / `+`.
pub const UNARY_BP: u8 = 15;

/// Returns the prefix binding power for a token.
///
/// Returns `None` if the token is not a prefix operator.
#[must_use]
pub const fn prefix_binding_power(kind: &TokenKind) -> Option<u8> {
    match kind {
        TokenKind::Minus | TokenKind::Plus => Some(UNARY_BP),
        TokenKind::Keyword(Keyword::Not) => Some(NOT_BP),
        _ => None,
    }
}

/// Returns the infix binding power for a token.
///
/// Returns `(left_bp, right_bp)` where:
/// - Higher binding power = binds tighter
/// - Left associative: left_bp < right_bp
///
/// Returns `None` if the token is not an infix operator.
#[must_use]
pub const fn infix_binding_power(kind: &TokenKind) -> Option<(u8, u8)> {
    match kind {
        // Logical OR (lowest precedence)
        TokenKind::Keyword(Keyword::Or) => Some((1, 2)),

        // Logical AND
        TokenKind::Keyword(Keyword::And) => Some((3, 4)),

        // Comparisons and predicates, non-associative
        TokenKind::Eq
        | TokenKind::NotEq
        | TokenKind::Lt
        | TokenKind::LtEq
        | TokenKind::Gt
        | TokenKind::GtEq
        | TokenKind::Keyword(
            Keyword::Is
            | Keyword::In
            | Keyword::Between
            | Keyword::Like
            | Keyword::Match
            | Keyword::Overlaps
            | Keyword::Not,
        ) => Some((COMPARISON_BP, COMPARISON_BP + 2)),

        // String concatenation binds looser than arithmetic
        TokenKind::Concat => Some((9, 10)),

        // Additive
        TokenKind::Plus | TokenKind::Minus => Some((11, 12)),

        // Multiplicative
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some((13, 14)),

        _ => None,
    }
}

/// Converts a token to a binary operator.
#[must_use]
pub const fn token_to_binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::Percent => Some(BinaryOp::Mod),
        TokenKind::Eq => Some(BinaryOp::Eq),
        TokenKind::NotEq => Some(BinaryOp::NotEq),
        TokenKind::Lt => Some(BinaryOp::Lt),
        TokenKind::LtEq => Some(BinaryOp::LtEq),
        TokenKind::Gt => Some(BinaryOp::Gt),
        TokenKind::GtEq => Some(BinaryOp::GtEq),
        TokenKind::Keyword(Keyword::And) => Some(BinaryOp::And),
        TokenKind::Keyword(Keyword::Or) => Some(BinaryOp::Or),
        TokenKind::Concat => Some(BinaryOp::Concat),
        _ => None,
    }
}

/// Converts a token to a unary operator. Unary `+` has no node of its own.
#[must_use]
pub const fn token_to_unary_op(kind: &TokenKind) -> Option<UnaryOp> {
    match kind {
        TokenKind::Minus => Some(UnaryOp::Neg),
        TokenKind::Keyword(Keyword::Not) => Some(UnaryOp::Not),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_ordering() {
        let or_bp = infix_binding_power(&TokenKind::Keyword(Keyword::Or)).unwrap();
        let and_bp = infix_binding_power(&TokenKind::Keyword(Keyword::And)).unwrap();
        let eq_bp = infix_binding_power(&TokenKind::Eq).unwrap();
        let concat_bp = infix_binding_power(&TokenKind::Concat).unwrap();
        let add_bp = infix_binding_power(&TokenKind::Plus).unwrap();
        let mul_bp = infix_binding_power(&TokenKind::Star).unwrap();

        assert!(and_bp.0 > or_bp.0);
        assert!(NOT_BP > and_bp.0 && NOT_BP < eq_bp.0);
        assert!(concat_bp.0 > eq_bp.0);
        assert!(add_bp.0 > concat_bp.0);
        assert!(mul_bp.0 > add_bp.0);
        assert!(UNARY_BP > mul_bp.0);
    }

    #[test]
    fn test_predicates_share_comparison_level() {
        for kw in [Keyword::Like, Keyword::In, Keyword::Between, Keyword::Is] {
            assert_eq!(
                infix_binding_power(&TokenKind::Keyword(kw)).map(|bp| bp.0),
                Some(COMPARISON_BP)
            );
        }
    }

    #[test]
    fn test_token_to_binary_op() {
        assert_eq!(token_to_binary_op(&TokenKind::Plus), Some(BinaryOp::Add));
        assert_eq!(token_to_binary_op(&TokenKind::Concat), Some(BinaryOp::Concat));
        assert_eq!(token_to_binary_op(&TokenKind::Eq), Some(BinaryOp::Eq));
        assert_eq!(token_to_binary_op(&TokenKind::LeftParen), None);
    }

    #[test]
    fn test_token_to_unary_op() {
        assert_eq!(token_to_unary_op(&TokenKind::Minus), Some(UnaryOp::Neg));
        assert_eq!(
            token_to_unary_op(&TokenKind::Keyword(Keyword::Not)),
            Some(UnaryOp::Not)
        );
        assert_eq!(token_to_unary_op(&TokenKind::Plus), None);
    }
}
