//! # Birthdays Feature
//!
//! Birthday list ordered by the next occurrence, plus the notice texts the
//! scheduler sends ahead of and on the day.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Year is optional; 29 Feb is celebrated on 28 Feb in common years
//! - 1.0.0: Initial release

use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate};

use crate::core::datetime::{days_until, next_occurrence, parse_birth_date, MonthDay};
use crate::core::keyboard::{nav_row, paginate, truncate_chars, Button, Keyboard, Screen, Style};
use crate::core::response::escape_markdown;
use crate::database::Birthday;

pub const BIRTHDAYS_PER_PAGE: usize = 10;
pub const NAME_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BirthdayForm {
    pub name: String,
    pub date: String,
}

pub fn validate_name(input: &str) -> Result<String> {
    let name = input.trim();
    if name.is_empty() {
        return Err(anyhow!("The name cannot be empty"));
    }
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(anyhow!("The name must be at most {NAME_MAX_CHARS} characters long"));
    }
    Ok(name.to_string())
}

pub fn validate_birthday_form(form: &BirthdayForm, today: NaiveDate) -> Result<(String, MonthDay)> {
    let name = validate_name(&form.name)?;
    let date = parse_birth_date(&form.date, today)
        .map_err(|e| anyhow!("Invalid date ({e}). Use DD.MM.YYYY or DD.MM, e.g. 15.06.1990"))?;
    Ok((name, date))
}

/// Days until the next birthday; 0 means today
pub fn days_until_birthday(birthday: &Birthday, today: NaiveDate) -> i64 {
    days_until(birthday.day, birthday.month, today).unwrap_or(i64::MAX)
}

/// Age reached on `on`, when the birth year is known
pub fn turning_age(birthday: &Birthday, on: NaiveDate) -> Option<i32> {
    birthday.year.map(|year| on.year() - year).filter(|age| *age > 0)
}

pub fn sort_by_next_occurrence(birthdays: &mut [Birthday], today: NaiveDate) {
    birthdays.sort_by(|a, b| {
        days_until_birthday(a, today)
            .cmp(&days_until_birthday(b, today))
            .then_with(|| a.name.cmp(&b.name))
    });
}

pub fn format_birth_date(date: &MonthDay) -> String {
    match date.year {
        Some(year) => format!("{:02}.{:02}.{year}", date.day, date.month),
        None => format!("{:02}.{:02}", date.day, date.month),
    }
}

fn urgency_marker(days: i64) -> &'static str {
    match days {
        0 => "🎉",
        1..=3 => "🔴",
        4..=7 => "🟡",
        8..=30 => "🟢",
        _ => "⚪",
    }
}

fn days_label(days: i64) -> String {
    match days {
        0 => "today!".to_string(),
        1 => "tomorrow".to_string(),
        n => format!("in {n} days"),
    }
}

fn list_keyboard() -> Keyboard {
    Keyboard::new().row(vec![
        Button::new("➕ Add birthday", "bd:add").style(Style::Success),
        Button::new("◀️ Back", "menu:main"),
    ])
}

/// Birthday list page; `birthdays` must already be sorted for display
pub fn list_screen(birthdays: &[Birthday], page: usize, today: NaiveDate) -> Screen {
    if birthdays.is_empty() {
        return Screen::new(
            "🎂 **No birthdays saved yet**\n\nAdd one and I will remind you in time.",
            list_keyboard(),
        );
    }

    let page = paginate(birthdays, page, BIRTHDAYS_PER_PAGE);
    let mut text = format!(
        "🎂 **Birthdays** (page {}/{})\n\n",
        page.index + 1,
        page.total_pages
    );

    let mut numbers = Vec::with_capacity(page.items.len());
    for (i, birthday) in page.items.iter().enumerate() {
        let number = page.offset + i + 1;
        let days = days_until_birthday(birthday, today);
        let age = next_occurrence(birthday.day, birthday.month, today)
            .and_then(|next| turning_age(birthday, next))
            .map(|age| format!(", turns {age}"))
            .unwrap_or_default();

        text.push_str(&format!(
            "`{number}` {} **{}** • {} ({}{age})\n",
            urgency_marker(days),
            escape_markdown(&truncate_chars(&birthday.name, 50)),
            format_birth_date(&birthday.date()),
            days_label(days),
        ));
        numbers.push(Button::new(number.to_string(), format!("bd:view:{}", birthday.id)));
    }

    let keyboard = Keyboard::new()
        .row(numbers)
        .row(nav_row(&page, |p| format!("bd:list:{p}"), "bd:noop"))
        .extend(list_keyboard());

    Screen::new(text.trim_end(), keyboard)
}

pub fn birthday_screen(birthday: &Birthday, today: NaiveDate) -> Screen {
    let days = days_until_birthday(birthday, today);
    let mut text = format!(
        "🎂 **{}**\n\n**Date:** {}\n**Next:** {}",
        escape_markdown(&birthday.name),
        format_birth_date(&birthday.date()),
        days_label(days)
    );
    if let Some(age) = next_occurrence(birthday.day, birthday.month, today)
        .and_then(|next| turning_age(birthday, next))
    {
        text.push_str(&format!("\n**Turns:** {age}"));
    }

    Screen::new(
        text,
        Keyboard::new().row(vec![
            Button::new("🗑 Delete", format!("bd:delete:{}", birthday.id)).style(Style::Danger),
            Button::new("◀️ To list", "bd:list:0"),
        ]),
    )
}

pub fn saved_text(name: &str, date: &MonthDay, today: NaiveDate) -> String {
    let days = days_until(date.day, date.month, today).unwrap_or_default();
    format!(
        "✅ **Birthday saved!**\n\n**Name:** {}\n**Date:** {}\n**Next:** {}",
        escape_markdown(name),
        format_birth_date(date),
        days_label(days)
    )
}

/// Advance notice sent `days_ahead` days before the birthday
pub fn advance_notice(birthday: &Birthday, days_ahead: i64, occurs_on: NaiveDate) -> String {
    let age = turning_age(birthday, occurs_on)
        .map(|age| format!(" They turn {age}."))
        .unwrap_or_default();
    format!(
        "🎂 **Birthday reminder**\n\n{} it's **{}**'s birthday ({}).{age}\nDon't forget to prepare a gift!",
        capitalize_first(&days_label(days_ahead)),
        escape_markdown(&birthday.name),
        occurs_on.format("%d.%m"),
    )
}

/// Greeting notice sent on the day
pub fn today_notice(birthday: &Birthday, today: NaiveDate) -> String {
    let age = turning_age(birthday, today)
        .map(|age| format!(" They turn {age} today."))
        .unwrap_or_default();
    format!(
        "🎉 **Today is {}'s birthday!**{age}\nDon't forget to congratulate them!",
        escape_markdown(&birthday.name)
    )
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn birthday(id: i64, name: &str, day: u32, month: u32, year: Option<i32>) -> Birthday {
        Birthday {
            id,
            user_id: 1,
            name: name.to_string(),
            day,
            month,
            year,
        }
    }

    #[test]
    fn test_validate_form() {
        let today = date(2025, 3, 10);
        let form = BirthdayForm {
            name: " Alice ".into(),
            date: "15.06.1990".into(),
        };
        let (name, parsed) = validate_birthday_form(&form, today).unwrap();
        assert_eq!(name, "Alice");
        assert_eq!(parsed.year, Some(1990));

        let no_year = BirthdayForm {
            name: "Bob".into(),
            date: "29.02".into(),
        };
        assert!(validate_birthday_form(&no_year, today).is_ok());

        assert!(validate_name("").is_err());
        assert!(validate_name(&"n".repeat(101)).is_err());
        let bad_date = BirthdayForm {
            name: "Bob".into(),
            date: "31.02.1990".into(),
        };
        assert!(validate_birthday_form(&bad_date, today).is_err());
    }

    #[test]
    fn test_days_until_and_age() {
        let today = date(2025, 3, 10);
        let alice = birthday(1, "Alice", 11, 3, Some(1990));
        assert_eq!(days_until_birthday(&alice, today), 1);
        assert_eq!(turning_age(&alice, date(2025, 3, 11)), Some(35));

        let passed = birthday(2, "Bob", 9, 3, None);
        assert_eq!(days_until_birthday(&passed, today), 364);
        assert_eq!(turning_age(&passed, today), None);
    }

    #[test]
    fn test_leap_day_birthday_in_common_year() {
        let leap = birthday(1, "Leap", 29, 2, Some(2000));
        assert_eq!(days_until_birthday(&leap, date(2025, 2, 27)), 1);
        assert_eq!(days_until_birthday(&leap, date(2025, 2, 28)), 0);
        assert_eq!(days_until_birthday(&leap, date(2028, 2, 28)), 1);
    }

    #[test]
    fn test_sort_by_next_occurrence() {
        let today = date(2025, 3, 10);
        let mut list = vec![
            birthday(1, "January", 5, 1, None),
            birthday(2, "Today", 10, 3, None),
            birthday(3, "April", 1, 4, None),
        ];
        sort_by_next_occurrence(&mut list, today);
        let names: Vec<&str> = list.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Today", "April", "January"]);
    }

    #[test]
    fn test_list_screen() {
        let today = date(2025, 3, 10);
        let list: Vec<Birthday> = (1..=12)
            .map(|i| birthday(i, &format!("Friend {i}"), i as u32, 4, Some(1990)))
            .collect();

        let screen = list_screen(&list, 0, today);
        assert!(screen.text.contains("(page 1/2)"));
        assert!(screen.text.contains("**Friend 1** • 01.04.1990 (in 22 days, turns 35)"));
        assert_eq!(screen.keyboard.rows()[0].len(), 5);
        assert_eq!(screen.keyboard.rows()[1].len(), 5);
        assert!(screen.keyboard.find("bd:view:10").is_some());
        assert!(screen.keyboard.find("bd:list:1").is_some());
        assert!(screen.keyboard.validate().is_ok());

        assert!(list_screen(&[], 0, today).text.contains("No birthdays"));
    }

    #[test]
    fn test_notices() {
        let alice = birthday(1, "Alice", 11, 3, Some(1990));
        let advance = advance_notice(&alice, 1, date(2025, 3, 11));
        assert!(advance.contains("Tomorrow it's **Alice**'s birthday (11.03). They turn 35."));

        let in_three = advance_notice(&alice, 3, date(2025, 3, 11));
        assert!(in_three.contains("In 3 days"));

        let today = today_notice(&birthday(2, "Bob", 10, 3, None), date(2025, 3, 10));
        assert!(today.contains("Today is Bob's birthday!"));
        assert!(!today.contains("turn"));
    }

    #[test]
    fn test_birthday_screen() {
        let screen = birthday_screen(&birthday(4, "Carol", 10, 3, Some(2000)), date(2025, 3, 10));
        assert!(screen.text.contains("**Next:** today!"));
        assert!(screen.text.contains("**Turns:** 25"));
        assert!(screen.keyboard.find("bd:delete:4").is_some());
    }
}
