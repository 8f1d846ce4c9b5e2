use chrono::offset::LocalResult;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Окно дат [start, end): конец эксклюзивен, поэтому соседние окна
/// никогда не пересекаются и заказ на границе не считается дважды.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    /// Эксклюзивная верхняя граница
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(end > start, "window end must be after start");
        Self { start, end }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Календарные даты окна (локальные для магазина)
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates = Vec::with_capacity(self.days().max(0) as usize);
        let mut current = self.start;
        while current < self.end {
            dates.push(current);
            current = current.succ_opt().unwrap_or(self.end);
        }
        dates
    }

    /// Границы окна как UTC-инстанты локальных полуночей магазина.
    ///
    /// Верхняя граница остается эксклюзивной: заказ, созданный ровно
    /// в end-инстант, принадлежит следующему окну.
    pub fn to_utc_range(&self, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            local_midnight_to_utc(self.start, tz),
            local_midnight_to_utc(self.end, tz),
        )
    }
}

fn local_midnight_to_utc(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        // Перевод часов: берем более ранний из двух вариантов
        LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        // Полночь выпала из-за перевода часов: сдвигаемся на час вперед
        LocalResult::None => tz
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight)),
    }
}

/// Разбить [start, end) на последовательные окна по chunk_days дней.
///
/// Последнее окно может быть короче. Пустой диапазон дает пустой список.
pub fn split_range(start: NaiveDate, end_exclusive: NaiveDate, chunk_days: i64) -> Vec<DateWindow> {
    let step = chunk_days.max(1);
    let mut windows = Vec::new();
    let mut current = start;

    while current < end_exclusive {
        let next = (current + Duration::days(step)).min(end_exclusive);
        windows.push(DateWindow::new(current, next));
        current = next;
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_split_covers_range_without_overlap() {
        let windows = split_range(date(2024, 1, 1), date(2024, 1, 18), 7);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0], DateWindow::new(date(2024, 1, 1), date(2024, 1, 8)));
        assert_eq!(windows[1], DateWindow::new(date(2024, 1, 8), date(2024, 1, 15)));
        assert_eq!(windows[2], DateWindow::new(date(2024, 1, 15), date(2024, 1, 18)));

        // Соседние окна стыкуются без зазора и пересечения
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        // Объединение дат окон равно датам диапазона
        let all_dates: Vec<NaiveDate> = windows.iter().flat_map(|w| w.dates()).collect();
        assert_eq!(all_dates.len(), 17);
        assert_eq!(all_dates[0], date(2024, 1, 1));
        assert_eq!(*all_dates.last().unwrap(), date(2024, 1, 17));
    }

    #[test]
    fn test_split_range_shorter_than_chunk() {
        let windows = split_range(date(2024, 1, 1), date(2024, 1, 3), 7);
        assert_eq!(windows, vec![DateWindow::new(date(2024, 1, 1), date(2024, 1, 3))]);
    }

    #[test]
    fn test_split_empty_range() {
        assert!(split_range(date(2024, 1, 1), date(2024, 1, 1), 7).is_empty());
    }

    #[test]
    fn test_schedule_chunks_subdivide_into_windows() {
        // Путь бэкфилла: крупные чанки, внутри — недельные окна
        let chunks = split_range(date(2024, 1, 1), date(2024, 9, 1), 120);
        assert_eq!(chunks.len(), 3);
        let windows: Vec<DateWindow> = chunks
            .iter()
            .flat_map(|c| split_range(c.start, c.end, 7))
            .collect();
        let total_days: i64 = windows.iter().map(|w| w.days()).sum();
        assert_eq!(total_days, (date(2024, 9, 1) - date(2024, 1, 1)).num_days());
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_utc_range_is_exclusive_at_boundary() {
        let w1 = DateWindow::new(date(2024, 1, 1), date(2024, 1, 8));
        let w2 = DateWindow::new(date(2024, 1, 8), date(2024, 1, 15));
        let (_, w1_end) = w1.to_utc_range(chrono_tz::Tz::UTC);
        let (w2_start, _) = w2.to_utc_range(chrono_tz::Tz::UTC);

        // Инстант 2024-01-08T00:00:00Z — верхняя (эксклюзивная) граница
        // первого окна и включительное начало второго
        let boundary: DateTime<Utc> = "2024-01-08T00:00:00Z".parse().unwrap();
        assert_eq!(w1_end, boundary);
        assert_eq!(w2_start, boundary);
    }

    #[test]
    fn test_utc_range_respects_store_timezone() {
        let tz: Tz = "Asia/Kolkata".parse().unwrap();
        let w = DateWindow::new(date(2024, 1, 1), date(2024, 1, 8));
        let (start_utc, end_utc) = w.to_utc_range(tz);
        // Полночь IST = 18:30 UTC предыдущего дня
        assert_eq!(start_utc, "2023-12-31T18:30:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(end_utc, "2024-01-07T18:30:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_window_dates() {
        let w = DateWindow::new(date(2024, 2, 27), date(2024, 3, 2));
        assert_eq!(
            w.dates(),
            vec![
                date(2024, 2, 27),
                date(2024, 2, 28),
                date(2024, 2, 29),
                date(2024, 3, 1),
            ]
        );
    }
}
