use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_hospitals_table::Migration),
            Box::new(m20250101_000002_create_departments_table::Migration),
            Box::new(m20250101_000003_create_patients_table::Migration),
            Box::new(m20250101_000004_create_practitioners_table::Migration),
            Box::new(m20250101_000005_create_medical_records_table::Migration),
            Box::new(m20250101_000006_create_emergency_alerts_table::Migration),
        ]
    }
}

// Migration implementations

mod m20250101_000001_create_hospitals_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_hospitals_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Hospitals::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Hospitals::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Hospitals::Name).string().not_null())
                        .col(ColumnDef::new(Hospitals::Address).string().not_null())
                        .col(ColumnDef::new(Hospitals::Phone).string().not_null())
                        .col(ColumnDef::new(Hospitals::Email).string().null())
                        .col(ColumnDef::new(Hospitals::EmergencyContact).string().not_null())
                        .col(
                            ColumnDef::new(Hospitals::BedCapacity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Hospitals::AvailableBeds)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Hospitals::Specialties).json().not_null())
                        .col(ColumnDef::new(Hospitals::Status).string_len(16).not_null())
                        .col(ColumnDef::new(Hospitals::Latitude).double().null())
                        .col(ColumnDef::new(Hospitals::Longitude).double().null())
                        .col(
                            ColumnDef::new(Hospitals::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Hospitals::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_hospitals_name")
                        .table(Hospitals::Table)
                        .col(Hospitals::Name)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Hospitals::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Hospitals {
        Table,
        Id,
        Name,
        Address,
        Phone,
        Email,
        EmergencyContact,
        BedCapacity,
        AvailableBeds,
        Specialties,
        Status,
        Latitude,
        Longitude,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000002_create_departments_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_departments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Departments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Departments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Departments::HospitalId).uuid().not_null())
                        .col(ColumnDef::new(Departments::Name).string().not_null())
                        .col(ColumnDef::new(Departments::HeadDoctor).string().null())
                        .col(ColumnDef::new(Departments::Phone).string().null())
                        .col(ColumnDef::new(Departments::BedCount).integer().null())
                        .col(ColumnDef::new(Departments::AvailableBeds).integer().null())
                        .col(ColumnDef::new(Departments::Equipment).json().not_null())
                        .col(ColumnDef::new(Departments::Status).string().not_null())
                        .col(
                            ColumnDef::new(Departments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Departments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_departments_hospital_id")
                        .table(Departments::Table)
                        .col(Departments::HospitalId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Departments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Departments {
        Table,
        Id,
        HospitalId,
        Name,
        HeadDoctor,
        Phone,
        BedCount,
        AvailableBeds,
        Equipment,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000003_create_patients_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_patients_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Patients::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Patients::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Patients::PatientId).string().not_null())
                        .col(ColumnDef::new(Patients::Name).string().not_null())
                        .col(ColumnDef::new(Patients::Age).integer().null())
                        .col(ColumnDef::new(Patients::Gender).string().null())
                        .col(ColumnDef::new(Patients::Phone).string().null())
                        .col(ColumnDef::new(Patients::Email).string().null())
                        .col(ColumnDef::new(Patients::Address).string().null())
                        .col(ColumnDef::new(Patients::BloodType).string().null())
                        .col(ColumnDef::new(Patients::Allergies).json().not_null())
                        .col(ColumnDef::new(Patients::ChronicConditions).json().not_null())
                        .col(ColumnDef::new(Patients::EmergencyContactName).string().null())
                        .col(ColumnDef::new(Patients::EmergencyContactPhone).string().null())
                        .col(ColumnDef::new(Patients::InsuranceInfo).json().null())
                        .col(
                            ColumnDef::new(Patients::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Patients::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Intake upserts rely on this constraint to deduplicate business identifiers.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_patients_patient_id")
                        .table(Patients::Table)
                        .col(Patients::PatientId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Patients::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Patients {
        Table,
        Id,
        PatientId,
        Name,
        Age,
        Gender,
        Phone,
        Email,
        Address,
        BloodType,
        Allergies,
        ChronicConditions,
        EmergencyContactName,
        EmergencyContactPhone,
        InsuranceInfo,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000004_create_practitioners_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_practitioners_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Practitioners::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Practitioners::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Practitioners::HospitalId).uuid().not_null())
                        .col(ColumnDef::new(Practitioners::DepartmentId).uuid().null())
                        .col(ColumnDef::new(Practitioners::UserId).uuid().null())
                        .col(ColumnDef::new(Practitioners::Name).string().not_null())
                        .col(ColumnDef::new(Practitioners::Email).string().not_null())
                        .col(ColumnDef::new(Practitioners::Phone).string().null())
                        .col(ColumnDef::new(Practitioners::Specialization).string().not_null())
                        .col(ColumnDef::new(Practitioners::LicenseNumber).string().not_null())
                        .col(ColumnDef::new(Practitioners::ExperienceYears).integer().null())
                        .col(
                            ColumnDef::new(Practitioners::AvailabilityStatus)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Practitioners::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Practitioners::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_practitioners_hospital_id")
                        .table(Practitioners::Table)
                        .col(Practitioners::HospitalId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Practitioners::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Practitioners {
        Table,
        Id,
        HospitalId,
        DepartmentId,
        UserId,
        Name,
        Email,
        Phone,
        Specialization,
        LicenseNumber,
        ExperienceYears,
        AvailabilityStatus,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000005_create_medical_records_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_medical_records_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(MedicalRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MedicalRecords::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MedicalRecords::PatientId).uuid().not_null())
                        .col(ColumnDef::new(MedicalRecords::HospitalId).uuid().not_null())
                        .col(ColumnDef::new(MedicalRecords::PractitionerId).uuid().null())
                        .col(ColumnDef::new(MedicalRecords::Diagnosis).text().null())
                        .col(ColumnDef::new(MedicalRecords::Symptoms).json().not_null())
                        .col(ColumnDef::new(MedicalRecords::Treatment).text().null())
                        .col(ColumnDef::new(MedicalRecords::Medications).json().null())
                        .col(ColumnDef::new(MedicalRecords::VitalSigns).json().null())
                        .col(ColumnDef::new(MedicalRecords::TestResults).json().null())
                        .col(ColumnDef::new(MedicalRecords::Notes).text().null())
                        .col(ColumnDef::new(MedicalRecords::SeverityLevel).string_len(16).null())
                        .col(
                            ColumnDef::new(MedicalRecords::VisitType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(MedicalRecords::Status).string().not_null())
                        .col(
                            ColumnDef::new(MedicalRecords::VisitDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MedicalRecords::DischargeDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(MedicalRecords::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MedicalRecords::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_medical_records_patient_id")
                        .table(MedicalRecords::Table)
                        .col(MedicalRecords::PatientId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_medical_records_visit_date")
                        .table(MedicalRecords::Table)
                        .col(MedicalRecords::VisitDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MedicalRecords::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum MedicalRecords {
        Table,
        Id,
        PatientId,
        HospitalId,
        PractitionerId,
        Diagnosis,
        Symptoms,
        Treatment,
        Medications,
        VitalSigns,
        TestResults,
        Notes,
        SeverityLevel,
        VisitType,
        Status,
        VisitDate,
        DischargeDate,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000006_create_emergency_alerts_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000006_create_emergency_alerts_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(EmergencyAlerts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(EmergencyAlerts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(EmergencyAlerts::HospitalId).uuid().not_null())
                        .col(ColumnDef::new(EmergencyAlerts::PatientId).uuid().null())
                        .col(
                            ColumnDef::new(EmergencyAlerts::AlertType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(EmergencyAlerts::Severity)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(EmergencyAlerts::Title).string().not_null())
                        .col(ColumnDef::new(EmergencyAlerts::Description).text().not_null())
                        .col(
                            ColumnDef::new(EmergencyAlerts::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(EmergencyAlerts::CreatedBy).uuid().null())
                        .col(ColumnDef::new(EmergencyAlerts::ResolvedBy).uuid().null())
                        .col(
                            ColumnDef::new(EmergencyAlerts::ResolvedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(EmergencyAlerts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(EmergencyAlerts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_emergency_alerts_created_at")
                        .table(EmergencyAlerts::Table)
                        .col(EmergencyAlerts::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(EmergencyAlerts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum EmergencyAlerts {
        Table,
        Id,
        HospitalId,
        PatientId,
        AlertType,
        Severity,
        Title,
        Description,
        Status,
        CreatedBy,
        ResolvedBy,
        ResolvedAt,
        CreatedAt,
        UpdatedAt,
    }
}
