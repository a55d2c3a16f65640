use crate::error::{
    BadBirthDateSnafu, BlankSnafu, FormatDateSnafu, NulCharacterSnafu, RosterResult, TooLongSnafu,
    ValidationError,
};
use snafu::{ResultExt, ensure};
use std::fmt::{Display, Formatter};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

pub type StudentId = i64;

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_CITY_CHARS: usize = 100;

const BIRTH_DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// A stored student. Only stores hand these out, so `id` is always one they assigned.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub city: String,
    pub address: String,
    pub birth_date: Date,
    pub is_active: bool,
}

impl Display for Student {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub name: String,
    pub city: String,
    pub address: String,
    pub birth_date: Date,
    pub is_active: bool,
}

impl NewStudent {
    pub fn new(
        name: impl Into<String>,
        city: impl Into<String>,
        address: impl Into<String>,
        birth_date: Date,
    ) -> Self {
        Self {
            name: name.into(),
            city: city.into(),
            address: address.into(),
            birth_date,
            is_active: true,
        }
    }

    #[must_use]
    pub const fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_name(&self.name)?;
        check_city(&self.city)?;
        check_address(&self.address)
    }

    /// Trims surrounding whitespace off the text fields, then validates what is left.
    pub fn tidied(mut self) -> Result<Self, ValidationError> {
        trim_in_place(&mut self.name);
        trim_in_place(&mut self.city);
        trim_in_place(&mut self.address);
        self.validate()?;
        Ok(self)
    }

    pub(crate) fn into_student(self, id: StudentId) -> Student {
        let Self {
            name,
            city,
            address,
            birth_date,
            is_active,
        } = self;

        Student {
            id,
            name,
            city,
            address,
            birth_date,
            is_active,
        }
    }
}

/// Fields to change on an existing student, `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<Date>,
    pub is_active: Option<bool>,
}

impl StudentPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            check_name(name)?;
        }
        if let Some(city) = &self.city {
            check_city(city)?;
        }
        if let Some(address) = &self.address {
            check_address(address)?;
        }
        Ok(())
    }

    pub fn tidied(mut self) -> Result<Self, ValidationError> {
        for text in [&mut self.name, &mut self.city, &mut self.address]
            .into_iter()
            .flatten()
        {
            trim_in_place(text);
        }
        self.validate()?;
        Ok(self)
    }

    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.city.is_none()
            && self.address.is_none()
            && self.birth_date.is_none()
            && self.is_active.is_none()
    }

    pub fn apply_to(self, student: &mut Student) {
        let Self {
            name,
            city,
            address,
            birth_date,
            is_active,
        } = self;

        if let Some(name) = name {
            student.name = name;
        }
        if let Some(city) = city {
            student.city = city;
        }
        if let Some(address) = address {
            student.address = address;
        }
        if let Some(birth_date) = birth_date {
            student.birth_date = birth_date;
        }
        if let Some(is_active) = is_active {
            student.is_active = is_active;
        }
    }
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

//postgres text can't hold NUL, so catch it here rather than as a query error
fn check_no_nul(field: &'static str, value: &str) -> Result<(), ValidationError> {
    ensure!(!value.contains('\0'), NulCharacterSnafu { field });
    Ok(())
}

fn check_not_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    ensure!(!value.trim().is_empty(), BlankSnafu { field });
    Ok(())
}

//counts chars rather than bytes, so "São Paulo" is 9 long
fn check_max_chars(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let found = value.chars().count();
    ensure!(found <= max, TooLongSnafu { field, max, found });
    Ok(())
}

fn check_name(name: &str) -> Result<(), ValidationError> {
    check_not_blank("name", name)?;
    check_no_nul("name", name)?;
    check_max_chars("name", name, MAX_NAME_CHARS)
}

fn check_city(city: &str) -> Result<(), ValidationError> {
    check_not_blank("city", city)?;
    check_no_nul("city", city)?;
    check_max_chars("city", city, MAX_CITY_CHARS)
}

fn check_address(address: &str) -> Result<(), ValidationError> {
    check_not_blank("address", address)?;
    check_no_nul("address", address)
}

pub fn parse_birth_date(original: &str) -> Result<Date, ValidationError> {
    Date::parse(original.trim(), BIRTH_DATE_FORMAT).context(BadBirthDateSnafu { original })
}

pub fn format_birth_date(date: Date) -> RosterResult<String> {
    date.format(BIRTH_DATE_FORMAT).context(FormatDateSnafu)
}
