pub mod responses;
pub mod routes;
pub mod validation;

pub mod admin {
    pub mod admin_handlers;
    pub mod admin_models;
}

pub mod attendance {
    pub mod attendance_handlers;
    pub mod attendance_models;
}

pub mod client_portal {
    pub mod client_portal_handlers;
    pub mod client_portal_models;
}

pub mod clients {
    pub mod clients_handlers;
    pub mod clients_models;
}

pub mod employee_portal {
    pub mod employee_portal_handlers;
    pub mod employee_portal_models;
}

pub mod employees {
    pub mod employees_handlers;
    pub mod employees_models;
}

pub mod login {
    pub mod login_handlers;
    pub mod login_models;
}

pub mod meetings {
    pub mod meetings_handlers;
    pub mod meetings_models;
}

pub mod notifications {
    pub mod notifications_handlers;
}

pub mod projects {
    pub mod projects_handlers;
    pub mod projects_models;
}

pub mod tasks {
    pub mod tasks_handlers;
    pub mod tasks_models;
}
