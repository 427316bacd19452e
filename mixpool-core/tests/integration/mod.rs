mod broadcast_records;
mod config_loading;
mod full_round;
