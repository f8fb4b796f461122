use actix_web::{web, HttpResponse};
use bcrypt::{hash, DEFAULT_COST};
use chrono::Utc;
use log::info;
use serde_json::json;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use super::employees_models::{
    CreateEmployeeRequest, EmployeeDetail, EmployeeProject, UpdateEmployeeRequest,
};
use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::db;
use crate::error::AppError;
use crate::models::employee::{Employee, EmployeeStatus, EMPLOYEE_SELECT};
use crate::models::user::Role;
use crate::routes::responses::{DataResponse, MessageResponse};
use crate::routes::validation;
use crate::services::ids::EMPLOYEE_IDS;
use crate::services::notifications::{EventKind, NotificationHub, Room};
use crate::services::pagination::{ListQuery, Paginated};

fn push_filters(builder: &mut QueryBuilder<'_, MySql>, query: &ListQuery) -> Result<(), AppError> {
    match query.status_filter() {
        Some("inactive") => {
            builder.push(" WHERE e.is_active = false");
        }
        Some(raw) => {
            let status: EmployeeStatus = validation::parse_enum("Status", raw)?;
            builder.push(" WHERE e.is_active = true AND e.status = ");
            builder.push_bind(status.as_str());
        }
        None => {
            builder.push(" WHERE e.is_active = true");
        }
    }
    if let Some(department) = query.department_filter() {
        builder.push(" AND e.department = ");
        builder.push_bind(department.to_string());
    }
    if let Some(pattern) = query.search_pattern() {
        builder.push(" AND (u.full_name LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR u.user_email LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR e.employee_code LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR e.designation LIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    Ok(())
}

pub async fn fetch_employee(pool: &MySqlPool, employee_id: i64) -> Result<Employee, AppError> {
    sqlx::query_as::<_, Employee>(&format!("{EMPLOYEE_SELECT} WHERE e.employee_id = ?"))
        .bind(employee_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Employee {employee_id} not found")))
}

// Handler to list employees
pub async fn list_employees(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let pagination = query.pagination();

    let mut count = QueryBuilder::<MySql>::new(
        "SELECT COUNT(*) FROM Employees_ e JOIN Users_ u ON e.user_id = u.user_id",
    );
    push_filters(&mut count, &query)?;
    let total: i64 = count.build_query_scalar().fetch_one(pool.get_ref()).await?;

    let mut rows = QueryBuilder::<MySql>::new(EMPLOYEE_SELECT);
    push_filters(&mut rows, &query)?;
    rows.push(" ORDER BY e.employee_code LIMIT ");
    rows.push_bind(pagination.limit());
    rows.push(" OFFSET ");
    rows.push_bind(pagination.offset());
    let employees: Vec<Employee> = rows.build_query_as().fetch_all(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(Paginated::new(employees, total, pagination)))
}

// Handler to get one employee with their projects
pub async fn get_employee(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let employee_id = path.into_inner();
    let employee = fetch_employee(pool.get_ref(), employee_id).await?;

    let projects: Vec<EmployeeProject> = sqlx::query_as(
        "SELECT p.project_id, p.project_code, p.name, p.status, 'manager' AS role
         FROM Projects_ p
         WHERE p.manager_id = ? AND p.is_active = true
         UNION
         SELECT p.project_id, p.project_code, p.name, p.status, 'member' AS role
         FROM Projects_ p
         JOIN ProjectTeam_ pt ON pt.project_id = p.project_id
         WHERE pt.employee_id = ? AND p.is_active = true
         ORDER BY project_code",
    )
    .bind(employee_id)
    .bind(employee_id)
    .fetch_all(pool.get_ref())
    .await?;

    let (open_tasks,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM Tasks_
         WHERE assignee_id = ? AND is_active = true AND status <> 'completed'",
    )
    .bind(employee_id)
    .fetch_one(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(DataResponse::new(EmployeeDetail {
        employee,
        projects,
        open_tasks,
    })))
}

// Handler to add an employee together with their login
pub async fn create_employee(
    pool: web::Data<MySqlPool>,
    config: web::Data<AppConfig>,
    hub: web::Data<NotificationHub>,
    user: AuthUser,
    request: web::Json<CreateEmployeeRequest>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let new = request.validate()?;
    info!("Received request to create employee: {}", new.email);

    let password_hash = hash(&request.password, DEFAULT_COST)?;
    let now = Utc::now().naive_utc();

    let mut tx = pool.begin().await?;
    let user_id =
        db::insert_user(&mut tx, &new.email, &password_hash, &new.full_name, Role::Employee, now)
            .await?;
    let (code, employee_id) = EMPLOYEE_IDS
        .insert_with_code(
            &mut tx,
            config.id_retry_attempts,
            "INSERT INTO Employees_ (employee_code, user_id, department, designation, phone,
                                     joining_date, status, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, true, ?, ?)",
            |q| {
                q.bind(user_id)
                    .bind(new.department.clone())
                    .bind(new.designation.clone())
                    .bind(new.phone.clone())
                    .bind(new.joining_date)
                    .bind(new.status.as_str())
                    .bind(now)
                    .bind(now)
            },
        )
        .await?;
    tx.commit().await?;
    info!("Employee {} created with code {}", new.email, code);

    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    hub.notify(
        pool.get_ref(),
        &[Room::Admin],
        EventKind::EmployeeCreated,
        &format!("{} joined {} as {}", employee.full_name, employee.department, code),
        json!({ "employee_id": employee_id, "employee_code": code }),
    )
    .await;

    Ok(HttpResponse::Created().json(MessageResponse::with_data("Employee created", &employee)))
}

// Handler to update an employee
pub async fn update_employee(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    path: web::Path<i64>,
    request: web::Json<UpdateEmployeeRequest>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let employee_id = path.into_inner();
    let existing = fetch_employee(pool.get_ref(), employee_id).await?;
    if !existing.is_active {
        return Err(AppError::not_found(format!("Employee {employee_id} not found")));
    }
    let employee = request.apply(existing)?;
    let now = Utc::now().naive_utc();

    let mut tx = pool.begin().await?;
    db::update_user_identity(&mut tx, employee.user_id, &employee.user_email, &employee.full_name, now)
        .await?;
    sqlx::query(
        "UPDATE Employees_
         SET department = ?, designation = ?, phone = ?, joining_date = ?, status = ?, updated_at = ?
         WHERE employee_id = ?",
    )
    .bind(&employee.department)
    .bind(&employee.designation)
    .bind(&employee.phone)
    .bind(employee.joining_date)
    .bind(&employee.status)
    .bind(now)
    .bind(employee_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("Employee {} updated", employee.employee_code);
    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::with_data("Employee updated", &employee)))
}

// Handler to soft-delete an employee
pub async fn delete_employee(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let employee_id = path.into_inner();
    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    if !employee.is_active {
        return Err(AppError::not_found(format!("Employee {employee_id} not found")));
    }

    let now = Utc::now().naive_utc();
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE Employees_ SET is_active = false, updated_at = ? WHERE employee_id = ?")
        .bind(now)
        .bind(employee_id)
        .execute(&mut *tx)
        .await?;
    db::deactivate_user(&mut tx, employee.user_id, now).await?;
    tx.commit().await?;

    info!("Employee {} deactivated", employee.employee_code);
    Ok(HttpResponse::Ok().json(MessageResponse::new("Employee deactivated")))
}

// Handler to list the departments in use
pub async fn list_departments(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
) -> Result<HttpResponse, AppError> {
    user.require(Role::Admin)?;
    let departments: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT department FROM Employees_ WHERE is_active = true ORDER BY department",
    )
    .fetch_all(pool.get_ref())
    .await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(departments)))
}
