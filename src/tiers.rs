//! Rating tiers
//!
//! Static rank table, checked from the highest threshold down.
//! Roughly one rank every 25 points between -500 and 500.

/// Label returned for scores below every threshold in [`RATING_TIERS`]
pub const FALLBACK_LABEL: &str = "Неизвестно";

/// `(min_score, label)`, thresholds strictly decreasing.
/// The last entry is the catch-all for everything above the fallback.
pub const RATING_TIERS: &[(i64, &str)] = &[
    // positive
    (500, "Бог среди смертных"),
    (475, "Легенда чата"),
    (450, "Неприкасаемый"),
    (425, "Икона стиля"),
    (400, "Царь горы"),
    (375, "Альфа-самец"),
    (350, "Босс мафии"),
    (325, "Крёстный отец"),
    (300, "Мастер кайфа"),
    (275, "Душа компании"),
    (250, "Профи"),
    (225, "Красавчик"),
    (200, "Уважаемый"),
    (175, "Свой в доску"),
    (150, "Норм пацан"),
    (125, "Поднимается"),
    (100, "Исправляется"),
    (75, "Подаёт надежды"),
    (50, "Пацан"),
    (25, "Зелёный"),
    (10, "Начал путь"),
    // neutral
    (0, "Нейтрал"),
    // negative
    (-10, "Мусорка"),
    (-25, "Шкура"),
    (-50, "Позор рода"),
    (-75, "Чмошник"),
    (-100, "Опущенный"),
    (-125, "Шавка подзаборная"),
    (-150, "Дно пробито"),
    (-175, "Хуеприёмник"),
    (-200, "Залупочёс"),
    (-225, "Сосатель бесплатный"),
    (-250, "Пиздоглот"),
    (-275, "Чмо болотное"),
    (-300, "Огрызок хуя"),
    (-325, "Подстилка вокзальная"),
    (-350, "Хуй моржовый"),
    (-375, "Гандон штопаный"),
    (-400, "Пердёж сатаны"),
    (-425, "Выкидыш кладбища"),
    (-450, "Абсолютный ноль"),
    (-475, "Аннигилирован"),
    (-500, "Ошибка природы"),
    (-99999, "Не существует"),
];

/// Resolve the rank label for a score.
///
/// Returns the label of the tier with the largest threshold `<= score`.
pub fn resolve_tier(score: i64) -> &'static str {
    RATING_TIERS
        .iter()
        .find(|(threshold, _)| score >= *threshold)
        .map(|(_, label)| *label)
        .unwrap_or(FALLBACK_LABEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_strictly_decreasing() {
        for pair in RATING_TIERS.windows(2) {
            assert!(pair[0].0 > pair[1].0, "{} !> {}", pair[0].0, pair[1].0);
        }
    }

    #[test]
    fn test_exact_thresholds() {
        for (threshold, label) in RATING_TIERS {
            assert_eq!(resolve_tier(*threshold), *label);
        }
    }

    #[test]
    fn test_between_thresholds_rounds_down() {
        assert_eq!(resolve_tier(30), "Зелёный");
        assert_eq!(resolve_tier(49), "Зелёный");
        assert_eq!(resolve_tier(5), "Нейтрал");
        assert_eq!(resolve_tier(-5), "Мусорка");
        assert_eq!(resolve_tier(-11), "Шкура");
    }

    #[test]
    fn test_extremes() {
        assert_eq!(resolve_tier(i64::MAX), "Бог среди смертных");
        assert_eq!(resolve_tier(-501), "Не существует");
        assert_eq!(resolve_tier(-100_000), FALLBACK_LABEL);
        assert_eq!(resolve_tier(i64::MIN), FALLBACK_LABEL);
    }

    #[test]
    fn test_matches_largest_threshold_at_or_below() {
        for score in (-600..=600).step_by(7) {
            let expected = RATING_TIERS
                .iter()
                .filter(|(t, _)| *t <= score)
                .max_by_key(|(t, _)| *t)
                .map(|(_, l)| *l)
                .unwrap_or(FALLBACK_LABEL);
            assert_eq!(resolve_tier(score), expected, "score {}", score);
        }
    }
}
