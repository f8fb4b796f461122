use std::collections::HashSet;
use std::convert::Infallible;

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use futures_util::stream::{self, StreamExt};
use log::info;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::notification::Notification;
use crate::models::user::Role;
use crate::routes::responses::MessageResponse;
use crate::services::notifications::{next_for_rooms, NotificationHub, Room};
use crate::services::pagination::{ListQuery, Paginated};

/// Rooms a user listens on: their role room plus one per related project.
pub fn rooms_for(role: Role, profile_id: Option<i64>, project_ids: &[i64]) -> Vec<Room> {
    let own = match (role, profile_id) {
        (Role::Admin, _) => return vec![Room::Admin],
        (Role::Employee, Some(id)) => Room::Employee(id),
        (Role::Client, Some(id)) => Room::Client(id),
        (_, None) => return Vec::new(),
    };
    let mut rooms = vec![own];
    rooms.extend(project_ids.iter().copied().map(Room::Project));
    rooms
}

async fn caller_rooms(pool: &MySqlPool, user: &AuthUser) -> Result<Vec<String>, AppError> {
    let (profile_id, project_ids): (Option<i64>, Vec<i64>) = match user.role {
        Role::Admin => (None, Vec::new()),
        Role::Employee => {
            let employee_id = user.employee_id(pool).await?;
            let ids: Vec<i64> = sqlx::query_scalar(
                "SELECT p.project_id FROM Projects_ p
                 WHERE p.is_active = true
                   AND (p.manager_id = ?
                        OR EXISTS (SELECT 1 FROM ProjectTeam_ pt
                                   WHERE pt.project_id = p.project_id AND pt.employee_id = ?))",
            )
            .bind(employee_id)
            .bind(employee_id)
            .fetch_all(pool)
            .await?;
            (Some(employee_id), ids)
        }
        Role::Client => {
            let client_id = user.client_id(pool).await?;
            let ids: Vec<i64> = sqlx::query_scalar(
                "SELECT project_id FROM Projects_ WHERE client_id = ? AND is_active = true",
            )
            .bind(client_id)
            .fetch_all(pool)
            .await?;
            (Some(client_id), ids)
        }
    };
    Ok(rooms_for(user.role, profile_id, &project_ids)
        .iter()
        .map(Room::to_string)
        .collect())
}

fn push_rooms(builder: &mut QueryBuilder<'_, MySql>, rooms: &[String]) {
    builder.push(" WHERE room IN (");
    let mut separated = builder.separated(", ");
    for room in rooms {
        separated.push_bind(room.clone());
    }
    separated.push_unseparated(")");
}

// Handler to list the caller's notifications
pub async fn list_notifications(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let rooms = caller_rooms(pool.get_ref(), &user).await?;
    let pagination = query.pagination();
    let unread_only = query.status_filter() == Some("unread");

    let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM Notifications_");
    push_rooms(&mut count, &rooms);
    if unread_only {
        count.push(" AND is_read = false");
    }
    let total: i64 = count.build_query_scalar().fetch_one(pool.get_ref()).await?;

    let mut rows = QueryBuilder::<MySql>::new(
        "SELECT notification_id, room, event, message, payload, is_read, created_at FROM Notifications_",
    );
    push_rooms(&mut rows, &rooms);
    if unread_only {
        rows.push(" AND is_read = false");
    }
    rows.push(" ORDER BY created_at DESC, notification_id DESC LIMIT ");
    rows.push_bind(pagination.limit());
    rows.push(" OFFSET ");
    rows.push_bind(pagination.offset());
    let notifications: Vec<Notification> = rows.build_query_as().fetch_all(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(Paginated::new(notifications, total, pagination)))
}

// Handler to mark one notification read
pub async fn mark_read(
    pool: web::Data<MySqlPool>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let notification_id = path.into_inner();
    let rooms = caller_rooms(pool.get_ref(), &user).await?;

    let mut lookup = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM Notifications_");
    push_rooms(&mut lookup, &rooms);
    lookup.push(" AND notification_id = ");
    lookup.push_bind(notification_id);
    let found: i64 = lookup.build_query_scalar().fetch_one(pool.get_ref()).await?;
    if found == 0 {
        return Err(AppError::not_found(format!("Notification {notification_id} not found")));
    }

    sqlx::query("UPDATE Notifications_ SET is_read = true WHERE notification_id = ?")
        .bind(notification_id)
        .execute(pool.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Notification marked as read")))
}

// Handler to mark everything the caller can see as read
pub async fn mark_all_read(pool: web::Data<MySqlPool>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let rooms = caller_rooms(pool.get_ref(), &user).await?;
    let mut update = QueryBuilder::<MySql>::new("UPDATE Notifications_ SET is_read = true");
    push_rooms(&mut update, &rooms);
    update.push(" AND is_read = false");
    let result = update.build().execute(pool.get_ref()).await?;

    info!("User {} marked {} notifications read", user.user_id, result.rows_affected());
    Ok(HttpResponse::Ok().json(MessageResponse::new("All notifications marked as read")))
}

// Handler for the live Server-Sent Events feed
pub async fn stream_notifications(
    pool: web::Data<MySqlPool>,
    hub: web::Data<NotificationHub>,
    user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let rooms: HashSet<String> = caller_rooms(pool.get_ref(), &user).await?.into_iter().collect();
    info!("User {} subscribed to {} rooms", user.user_id, rooms.len());

    let receiver = hub.subscribe();
    let hello = stream::once(async { Ok::<_, Infallible>(web::Bytes::from_static(b": connected\n\n")) });
    let events = stream::unfold((receiver, rooms), |(mut receiver, rooms)| async move {
        let event = next_for_rooms(&mut receiver, &rooms).await?;
        let frame = web::Bytes::from(event.to_sse_frame());
        Some((Ok::<_, Infallible>(frame), (receiver, rooms)))
    });

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(hello.chain(events)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admins_only_hear_the_admin_room() {
        assert_eq!(rooms_for(Role::Admin, Some(3), &[1, 2]), vec![Room::Admin]);
    }

    #[test]
    fn employees_hear_their_projects() {
        assert_eq!(
            rooms_for(Role::Employee, Some(4), &[7, 9]),
            vec![Room::Employee(4), Room::Project(7), Room::Project(9)]
        );
    }

    #[test]
    fn clients_hear_their_own_room() {
        assert_eq!(rooms_for(Role::Client, Some(2), &[]), vec![Room::Client(2)]);
    }

    #[test]
    fn missing_profile_hears_nothing() {
        assert!(rooms_for(Role::Employee, None, &[5]).is_empty());
    }
}
