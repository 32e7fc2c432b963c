mod backup;
mod estimate;
mod food;
mod helpers;
mod log;
mod search;

pub(crate) use backup::{cmd_export, cmd_import, cmd_wipe};
pub(crate) use estimate::cmd_estimate;
pub(crate) use food::{
    FoodEdits, cmd_food_add, cmd_food_delete, cmd_food_edit, cmd_food_list, cmd_food_show,
};
pub(crate) use log::{LogArgs, cmd_log_add, cmd_log_delete, cmd_log_edit, cmd_log_show};
pub(crate) use search::cmd_search;
