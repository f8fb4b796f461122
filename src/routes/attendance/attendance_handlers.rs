use actix_web::{web, HttpResponse};
use chrono::{Local, NaiveDate};
use log::info;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use super::attendance_models::{
    AttendanceEntry, AttendanceHistory, AttendanceQuery, CorrectAttendanceRequest, EmployeeAttendance,
};
use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::attendance::{Attendance, ATTENDANCE_SELECT};
use crate::models::employee::{EmployeeRef, EMPLOYEE_REF_SELECT};
use crate::models::user::Role;
use crate::routes::responses::{DataResponse, MessageResponse};
use crate::services::attendance::{daily_report, AttendancePolicy, DailyReport};

/// Today on the office clock.
pub fn office_today() -> NaiveDate {
    Local::now().date_naive()
}

pub async fn fetch_record(pool: &MySqlPool, attendance_id: i64) -> Result<Attendance, AppError> {
    sqlx::query_as::<_, Attendance>(&format!("{ATTENDANCE_SELECT} WHERE a.attendance_id = ?"))
        .bind(attendance_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Attendance record {attendance_id} not found")))
}

pub async fn record_for_day(
    pool: &MySqlPool,
    employee_id: i64,
    date: NaiveDate,
) -> Result<Option<Attendance>, AppError> {
    let record = sqlx::query_as::<_, Attendance>(&format!(
        "{ATTENDANCE_SELECT} WHERE a.employee_id = ? AND a.work_date = ?"
    ))
    .bind(employee_id)
    .bind(date)
    .fetch_optional(pool)
    .await?;
    Ok(record)
}

pub async fn history(
    pool: &MySqlPool,
    employee_id: i64,
    from: NaiveDate,
    to: NaiveDate,
    policy: &AttendancePolicy,
) -> Result<AttendanceHistory, AppError> {
    let records: Vec<Attendance> = sqlx::query_as(&format!(
        "{ATTENDANCE_SELECT} WHERE a.employee_id = ? AND a.work_date BETWEEN ? AND ?
         ORDER BY a.work_date DESC"
    ))
    .bind(employee_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    Ok(AttendanceHistory::new(from, to, records, policy))
}

/// Report for `date` over every active employee, optionally one department.
pub async fn report_for(
    pool: &MySqlPool,
    date: NaiveDate,
    department: Option<&str>,
    policy: &AttendancePolicy,
) -> Result<DailyReport, AppError> {
    let mut roster = QueryBuilder::<MySql>::new(EMPLOYEE_REF_SELECT);
    roster.push(" WHERE e.is_active = true");
    if let Some(department) = department {
        roster.push(" AND e.department = ");
        roster.push_bind(department.to_string());
    }
    let employees: Vec<EmployeeRef> = roster.build_query_as().fetch_all(pool).await?;

    let records: Vec<Attendance> =
        sqlx::query_as(&format!("{ATTENDANCE_SELECT} WHERE a.work_date = ?"))
            .bind(date)
            .fetch_all(pool)
            .await?;

    Ok(daily_report(date, employees, records, policy))
}

// Handler for the daily attendance report
pub async fn get_daily_report(
    pool: web::Data<MySqlPool>,
    config: web::Data<AppConfig>,
    user: AuthUser,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let date = query.date.unwrap_or_else(office_today);
    let report = report_for(pool.get_ref(), date, query.department_filter(), &config.attendance).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(report)))
}

// Handler for one employee's attendance history
pub async fn get_employee_attendance(
    pool: web::Data<MySqlPool>,
    config: web::Data<AppConfig>,
    user: AuthUser,
    path: web::Path<i64>,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let employee_id = path.into_inner();
    let (from, to) = query.range(office_today())?;

    let employee = sqlx::query_as::<_, EmployeeRef>(&format!("{EMPLOYEE_REF_SELECT} WHERE e.employee_id = ?"))
        .bind(employee_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found(format!("Employee {employee_id} not found")))?;
    let history = history(pool.get_ref(), employee_id, from, to, &config.attendance).await?;

    Ok(HttpResponse::Ok().json(DataResponse::new(EmployeeAttendance { employee, history })))
}

// Handler for admin corrections of a record
pub async fn correct_attendance(
    pool: web::Data<MySqlPool>,
    config: web::Data<AppConfig>,
    user: AuthUser,
    path: web::Path<i64>,
    request: web::Json<CorrectAttendanceRequest>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let existing = fetch_record(pool.get_ref(), path.into_inner()).await?;
    let record = request.apply(existing, &config.attendance)?;

    sqlx::query(
        "UPDATE Attendance_ SET check_in = ?, check_out = ?, status = ?, notes = ?
         WHERE attendance_id = ?",
    )
    .bind(record.check_in)
    .bind(record.check_out)
    .bind(&record.status)
    .bind(&record.notes)
    .bind(record.attendance_id)
    .execute(pool.get_ref())
    .await?;

    info!(
        "Attendance {} of employee {} corrected by user {} to {}",
        record.attendance_id, record.employee_id, user.user_id, record.status
    );
    let entry = AttendanceEntry::new(record, &config.attendance);
    Ok(HttpResponse::Ok().json(MessageResponse::with_data("Attendance updated", &entry)))
}
