//! Dice helpers for the rules engine.

use rand::Rng;

/// `dice` rolls of a `sides`-sided die plus a flat bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiceRoll {
    pub dice: i32,
    pub sides: i32,
    pub bonus: i32,
}

impl DiceRoll {
    pub fn new(dice: i32, sides: i32) -> DiceRoll {
        DiceRoll {
            dice,
            sides,
            bonus: 0,
        }
    }
}

fn one_die(sides: i32) -> i32 {
    rand::thread_rng().gen_range(1..=sides)
}

/// Plain roll. Degenerate dice contribute nothing beyond the bonus.
pub fn roll(dr: DiceRoll) -> i32 {
    if dr.dice <= 0 || dr.sides <= 0 {
        return dr.bonus;
    }
    (0..dr.dice).map(|_| one_die(dr.sides)).sum::<i32>() + dr.bonus
}

/// Exploding roll: a die landing on `explode_on` rolls again, at most
/// `max_explosions` times per die.
pub fn roll_explode(dr: DiceRoll, explode_on: i32, max_explosions: i32) -> i32 {
    if dr.dice <= 0 || dr.sides <= 0 {
        return dr.bonus;
    }
    let mut total = dr.bonus;
    for _ in 0..dr.dice {
        let mut value = one_die(dr.sides);
        total += value;
        let mut remaining = max_explosions;
        while value == explode_on && remaining > 0 {
            value = one_die(dr.sides);
            total += value;
            remaining -= 1;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        for _ in 0..100 {
            let v = roll(DiceRoll::new(2, 6));
            assert!((2..=12).contains(&v));
        }
        assert_eq!(roll(DiceRoll { dice: 0, sides: 6, bonus: 3 }), 3);
    }

    #[test]
    fn explode_bounds() {
        let dr = DiceRoll::new(1, 6);
        for _ in 0..100 {
            assert!(roll_explode(dr, 6, 1) <= 12);
            assert!(roll_explode(dr, 1, 2) <= 18);
            assert!(roll_explode(dr, 6, 0) <= 6);
        }
    }
}
