//! Wire formats for calendar dates and wall-clock times.

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");
time::serde::format_description!(pub hh_mm, Time, "[hour]:[minute]");
