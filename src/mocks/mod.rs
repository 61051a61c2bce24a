pub mod mock_sensors;
