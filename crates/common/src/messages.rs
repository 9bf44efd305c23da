//! User-facing message texts
//!
//! Every string the bot sends lives here so the service crates and the
//! tests agree on the exact wording.

use crate::format::{format_currency, format_number, format_quantity};
use crate::stats::CategoryStats;
use chrono::{DateTime, Datelike, Timelike, Utc};

/// Acknowledgement after a crawl job was submitted
pub const PROCESSING: &str = "⏳ Мы обрабатываем ваш запрос. Когда все будет готово, вы получите результат.\n\nБольшие категории (свыше 1 тыс. товаров) могут обрабатываться до одного часа.\n\nМаленькие категории обрабатываются в течение нескольких минут.";

/// Sent when the crawl queue is saturated or submission failed
pub const TOO_LONG_QUEUE: &str = "Извините, мы сейчас не можем обработать ваш запрос – у нас образовалась слишком большая очередь на анализ категорий. Пожалуйста, подождите немного и отправьте запрос снова.";

/// Sent when the crawl produced an empty or malformed item set
pub const EMPTY_CATEGORY: &str = "❌ Мы не смогли обработать ссылку. Скорее всего, вы указали неправильную страницу, либо категория оказалась пустой.";

/// Sent when the result never became ready within the retry budget
pub const COULD_NOT_PROCESS: &str = "❌ Мы не смогли обработать ваш запрос. Возможно, категория указана неверно или оказалась пустой. Попробуйте отправить ссылку позже.";

/// Reply to an unrecognized message
pub const UNKNOWN_COMMAND: &str = "⚠️🤷 Непонятная команда.\nСкорее всего, вы указали неправильную команду. Сейчас бот может анализировать только ссылки на каталоги Wildberries.";

/// "About the service" text
pub const INFO: &str = "📊 Этот телеграм бот поможет собирать данные о товарах на Wildberries и анализировать их.\n\n📲 Отправьте ссылку на интересующую категорию Wildberries, чтобы получить сводную информацию по ней.\n\n📑 Также вы получите файл с полной выгрузкой данных для самостоятельного и детального анализа.";

/// Reply to the "raise my limit" button
pub const NO_LIMITS: &str = "Если вы хотите увеличить или снять лимит запросов напишите нам в чат поддержки запрос с фразой «Снимите лимит запросов».";

/// Prompt shown by the "analyse a category" inline button
pub const ANALYSE_CATEGORY: &str = "📊 Анализ выбранной категории\n\nОтправьте ссылку на страницу категории Wildberries, чтобы получить сводную информацию по ней.\n\nВ ответ придет:\n1. Общее количество товаров;\n2. Общее количество продаж;\n3. Среднее арифметическое продаж одного товара;\n4. Медиана продаж;\n5. Средняя цена;\n6. Цена самого дорогого товара.";

/// How-to for picking a valid catalog link
pub const HELP_CATALOG_LINK: &str = "☝️ Чтобы провести анализ категории, скопируйте из адресной строки браузера ссылку на перечень товаров сайта Wildberries. Это может быть список из каталога или перечень результата поиска по сайту.\nНапример: https://www.wildberries.ru/catalog/zhenshchinam/odezhda/kigurumi\n\n💬 Такую ссылку необходимо отправить сообщением прямо в чате.\n\n⚠️ Ссылки на страницы отдельных товаров или на страницы статей выдадут ошибку.";

/// No category changes since the previous listing crawl
pub const CATEGORIES_UNCHANGED: &str = "За последние сутки категории на Wildberries не обновились";

/// Caption attached to the exported report document
pub const REPORT_CAPTION: &str = "Файл с отчетом";

/// Greeting for /start
pub fn greeting(full_name: &str) -> String {
    format!("Приветствую, {}!", full_name)
}

/// Start-command follow-up with the user's current allowance
pub fn start_info(requests_left: i64, daily_limit: i32) -> String {
    format!(
        "{}\n\n🔔 Вам доступно {} из {} запросов. Ограничение обнулится через 24 часа с момента последнего анализа.",
        INFO, requests_left, daily_limit
    )
}

/// Quota exhausted; quotes the exact recovery time
pub fn limit_exhausted(next_free_at: DateTime<Utc>) -> String {
    format!(
        "💫 Ваш лимит запросов закончился. Чтобы продолжить работу, напишите нам в чат поддержки с запросом на снятие ограничения, либо дождитесь восстановления лимита. Новый запрос вам станет доступным {}.{:02} в {} часов {} минут",
        next_free_at.day(),
        next_free_at.month(),
        next_free_at.hour(),
        next_free_at.minute()
    )
}

/// Remaining/used requests message with the moon-emoji gauge.
///
/// The gauge is only rendered when it stays readable (limit + used ≤ 10).
pub fn requests_count(requests_left: i64, requests_today: i64, daily_limit: i32) -> String {
    let emojis = if requests_left + requests_today <= 10 {
        let left: String = "🌕".repeat(requests_left.max(0) as usize);
        let used: String = "🌑".repeat(requests_today.max(0) as usize);
        format!("{}{}\n\n", left, used)
    } else {
        String::new()
    };

    if requests_left > 0 {
        format!(
            "Вам доступно {} из {} запросов\n{}Лимит восстанавится через 24 часа с момента анализа.",
            requests_left, daily_limit, emojis
        )
    } else {
        format!(
            "У вас больше нет доступных запросов.\n{}\n\nВы можете снять ограничения, купив платный аккаунт. Либо подождите 24 часа и лимит восстановится.",
            emojis
        )
    }
}

/// Announcement once the sliding window has fully recovered
pub fn requests_recovered(daily_limit: i32) -> String {
    let emoji: String = "🌕".repeat((daily_limit.max(0) as usize).min(10));
    format!(
        "🤘 Рок-н-ролл! Вам доступно {} новых запросов категорий Wildberries для анализа.\n{}",
        daily_limit, emoji
    )
}

/// Category summary message delivered together with the report file
pub fn category_summary(stats: &CategoryStats, marketplace: &str) -> String {
    format!(
        "Ваш отчет по категории [{name}]({url}) на {marketplace} находится в следующем сообщении.\n\nКраткая сводка:\nКоличество товаров: `{count}`\nПродаж всего: {purchases_sum} (на {turnover_sum})\nВ среднем продаются по: {purchases_mean} (на {turnover_mean})\nМедиана продаж: {purchases_median} (на {turnover_median})",
        name = stats.category_name(),
        url = stats.category_url(),
        marketplace = marketplace,
        count = format_number(stats.goods_count() as f64),
        purchases_sum = format_quantity(stats.purchases_sum()),
        turnover_sum = format_currency(stats.turnover_sum()),
        purchases_mean = format_quantity(stats.purchases_mean()),
        turnover_mean = format_currency(stats.turnover_mean()),
        purchases_median = format_quantity(stats.purchases_median()),
        turnover_median = format_currency(stats.turnover_median()),
    )
}

/// Broadcast sent to subscribers when the category listing changed
pub fn categories_updated(new_count: usize, new_unique_count: usize) -> String {
    format!(
        "Обновились данные по категориям на Wildberries. C последнего обновления добавилось {} категорий, из них {} уникальных",
        new_count, new_unique_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_limit_exhausted_quotes_recovery_time() {
        let at = Utc.with_ymd_and_hms(2030, 1, 16, 1, 30, 0).unwrap();
        let text = limit_exhausted(at);
        assert!(text.contains("Ваш лимит запросов закончился"));
        assert!(text.contains("16.01 в 1 часов 30 минут"));
    }

    #[test]
    fn test_requests_count_with_gauge() {
        let text = requests_count(2, 3, 5);
        assert!(text.contains("Вам доступно 2 из 5 запросов"));
        assert!(text.contains("🌕🌕🌑🌑🌑"));
    }

    #[test]
    fn test_requests_count_exhausted() {
        let text = requests_count(0, 5, 5);
        assert!(text.contains("У вас больше нет доступных запросов."));
    }

    #[test]
    fn test_requests_count_skips_gauge_for_large_limits() {
        let text = requests_count(15, 5, 20);
        assert!(!text.contains("🌕"));
    }

    #[test]
    fn test_negative_remaining_is_clamped_in_gauge() {
        // A lowered limit can make remaining negative; display must not panic.
        let text = requests_count(-1, 6, 5);
        assert!(text.contains("У вас больше нет доступных запросов."));
        assert!(!text.contains("🌕"));
    }
}
